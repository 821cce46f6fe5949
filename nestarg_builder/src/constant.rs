pub(crate) const HELP_NAME: &str = "help";
pub(crate) const HELP_SHORT: char = 'h';
pub(crate) const HELP_MESSAGE: &str = "Show this help message and exit.";

/// The option strings reserved for help, when help is enabled.
pub(crate) fn reserved_options() -> [String; 2] {
    [format!("-{HELP_SHORT}"), format!("--{HELP_NAME}")]
}
