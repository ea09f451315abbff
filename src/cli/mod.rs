pub mod config_cmd;
pub mod context;
pub mod history_cmd;
pub mod interactive_cmd;
pub mod output;
pub mod probe_cmd;
pub mod renderer;
pub mod report_cmd;
