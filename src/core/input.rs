use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("'{0}' is not a number, please use digits only")]
    NotANumber(String),
    #[error("Bandwidth used cannot be negative: {0}")]
    NegativeUsage(f64),
}

/// One line typed in interactive mode.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    Usage(f64),
    Save,
    Quit,
    Empty,
}

/// Parse a GB amount typed by the user.
pub fn parse_gb(text: &str) -> Result<f64, InputError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(InputError::NotANumber(trimmed.to_string())),
    }
}

/// Parse the bandwidth-used field.
pub fn parse_usage(text: &str) -> Result<f64, InputError> {
    let value = parse_gb(text)?;
    if value < 0.0 {
        return Err(InputError::NegativeUsage(value));
    }
    Ok(value)
}

pub fn parse_line(line: &str) -> Result<LineCommand, InputError> {
    match line.trim().to_lowercase().as_str() {
        "" => Ok(LineCommand::Empty),
        "save" | "s" => Ok(LineCommand::Save),
        "quit" | "q" | "exit" => Ok(LineCommand::Quit),
        other => parse_usage(other).map(LineCommand::Usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_numbers() {
        assert_eq!(parse_usage("600"), Ok(600.0));
        assert_eq!(parse_usage("  612.5 \n"), Ok(612.5));
        assert_eq!(parse_gb("-3"), Ok(-3.0));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert_eq!(parse_usage("60o"), Err(InputError::NotANumber("60o".to_string())));
        assert!(parse_usage("").is_err());
        assert!(parse_gb("inf").is_err());
        assert!(parse_gb("NaN").is_err());
    }

    #[test]
    fn rejects_negative_usage() {
        assert_eq!(parse_usage("-1"), Err(InputError::NegativeUsage(-1.0)));
    }

    #[test]
    fn parses_interactive_lines() {
        assert_eq!(parse_line("640"), Ok(LineCommand::Usage(640.0)));
        assert_eq!(parse_line("SAVE"), Ok(LineCommand::Save));
        assert_eq!(parse_line("q"), Ok(LineCommand::Quit));
        assert_eq!(parse_line("   "), Ok(LineCommand::Empty));
        assert!(matches!(parse_line("abc"), Err(InputError::NotANumber(_))));
    }
}
