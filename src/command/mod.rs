use crate::settings::SettingsError;
use regex::Regex;

/// Spindle relevant meaning of a command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpindleEvent {
    Stop,
    Start,
    Speed(f64),
}

/// Tokens the interpreter looks for. Matching is case insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTokens {
    pub stop: String,
    pub start: String,
    pub speed_prefix: char,
}

impl Default for CommandTokens {
    fn default() -> Self {
        Self {
            stop: String::from("M5"),
            start: String::from("M3"),
            speed_prefix: 'S',
        }
    }
}

/// Finds spindle tokens in a line of G-code.
///
/// This is not a G-code parser: a token counts wherever it shows up in the line.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    stop: String,
    start: String,
    speed: Regex,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::build(CommandTokens::default())
    }
}

impl CommandInterpreter {
    /// An empty stop or start token would match every line, a blank speed prefix every number.
    pub fn new(tokens: CommandTokens) -> Result<Self, SettingsError> {
        if tokens.stop.trim().is_empty() {
            return Err(SettingsError::EmptyToken("stop token"));
        }
        if tokens.start.trim().is_empty() {
            return Err(SettingsError::EmptyToken("start token"));
        }
        if tokens.speed_prefix.is_whitespace() {
            return Err(SettingsError::EmptyToken("speed prefix"));
        }
        Ok(Self::build(CommandTokens {
            stop: tokens.stop.trim().to_string(),
            start: tokens.start.trim().to_string(),
            ..tokens
        }))
    }

    fn build(tokens: CommandTokens) -> Self {
        let prefix = regex::escape(&tokens.speed_prefix.to_uppercase().to_string());
        let speed = Regex::new(&format!(r"{} *(-?[\d.]+)", prefix))
            .expect("escaped speed prefix is a valid pattern");
        Self {
            stop: tokens.stop.to_uppercase(),
            start: tokens.start.to_uppercase(),
            speed,
        }
    }

    /// Returns the events of `line` in the order they appear.
    pub fn interpret(&self, line: &str) -> Vec<SpindleEvent> {
        let command = line.trim().to_uppercase();
        let mut found: Vec<(usize, SpindleEvent)> = Vec::with_capacity(3);

        if let Some(pos) = command.find(&self.stop) {
            found.push((pos, SpindleEvent::Stop));
        }
        if let Some(pos) = command.find(&self.start) {
            found.push((pos, SpindleEvent::Start));
        }
        if let Some(caps) = self.speed.captures_iter(&command).last() {
            if let (Some(token), Some(numeral)) = (caps.get(0), caps.get(1)) {
                match numeral.as_str().parse::<f64>() {
                    Ok(speed) => found.push((token.start(), SpindleEvent::Speed(speed))),
                    Err(_) => log::debug!("ignoring malformed speed {:?}", numeral.as_str()),
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, event)| event).collect()
    }
}
