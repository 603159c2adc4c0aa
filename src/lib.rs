//! Bounded interpreters for four esoteric languages.
//!
//! Each engine is a pure value-in/value-out call: source text and
//! [`Options`] go in, program output plus the final machine state (or a
//! [`Diagnostic`]) come out. No state survives between calls, so separate
//! threads may run engines at the same time.
//!
//! ```
//! use esovm::{Language, Options, evaluate};
//!
//! let run = evaluate(Language::Brainfuck, "++++++++[>++++++++<-]>+.", &Options::new()).unwrap();
//! assert_eq!(run.output, "A");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub mod befunge;
pub mod brainfuck;
pub mod budget;
pub mod cow;
pub mod diagnostic;
pub mod jump;
pub mod options;
pub mod source;
pub mod stack;
pub mod tape;
pub mod whitespace;

pub use diagnostic::{Diagnostic, ErrorKind};
pub use options::{CancelToken, Options};

/// Result of a tape machine: the printed text and every cell touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeOutcome {
    pub output: String,
    pub tape: Vec<u8>,
}

/// Result of a stack machine: the printed text and the stack, bottom first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutcome {
    pub output: String,
    pub stack: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[value(alias = "bf")]
    Brainfuck,
    #[value(alias = "moo")]
    Cow,
    #[value(aliases = ["b93", "bef"])]
    Befunge,
    #[value(alias = "ws")]
    Whitespace,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Brainfuck, Language::Cow, Language::Befunge, Language::Whitespace];

    pub fn name(self) -> &'static str {
        match self {
            Language::Brainfuck => "brainfuck",
            Language::Cow => "cow",
            Language::Befunge => "befunge",
            Language::Whitespace => "whitespace",
        }
    }

    /// Filename used in diagnostics when the caller supplies none.
    pub fn virtual_name(self) -> &'static str {
        match self {
            Language::Brainfuck => brainfuck::VIRTUAL_NAME,
            Language::Cow => cow::VIRTUAL_NAME,
            Language::Befunge => befunge::VIRTUAL_NAME,
            Language::Whitespace => whitespace::VIRTUAL_NAME,
        }
    }

    /// Guesses the language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "bf" | "b" => Some(Language::Brainfuck),
            "cow" => Some(Language::Cow),
            "bef" | "b93" | "befunge" => Some(Language::Befunge),
            "ws" => Some(Language::Whitespace),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}' (expected brainfuck, cow, befunge or whitespace)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brainfuck" | "bf" => Ok(Language::Brainfuck),
            "cow" | "moo" => Ok(Language::Cow),
            "befunge" | "befunge93" | "befunge-93" | "b93" | "bef" => Ok(Language::Befunge),
            "whitespace" | "ws" => Ok(Language::Whitespace),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Machine state left behind when a program halts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum FinalState {
    Tape(Vec<u8>),
    Stack(Vec<i64>),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub language: Language,
    pub output: String,
    pub state: FinalState,
}

impl Evaluation {
    fn from_tape(language: Language, out: TapeOutcome) -> Self {
        Evaluation { language, output: out.output, state: FinalState::Tape(out.tape) }
    }

    fn from_stack(language: Language, out: StackOutcome) -> Self {
        Evaluation { language, output: out.output, state: FinalState::Stack(out.stack) }
    }
}

/// Runs `source` on the engine for `language`.
pub fn evaluate(language: Language, source: &str, options: &Options) -> Result<Evaluation, Diagnostic> {
    match language {
        Language::Brainfuck => brainfuck::evaluate_with(source, options).map(|o| Evaluation::from_tape(language, o)),
        Language::Cow => cow::evaluate_with(source, options).map(|o| Evaluation::from_tape(language, o)),
        Language::Befunge => befunge::evaluate_with(source, options).map(|o| Evaluation::from_stack(language, o)),
        Language::Whitespace => whitespace::evaluate_with(source, options).map(|output| Evaluation {
            language,
            output,
            state: FinalState::None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_each_engine() {
        let opts = Options::new();
        let bf = evaluate(Language::Brainfuck, "++.", &opts).unwrap();
        assert_eq!(bf.state, FinalState::Tape(vec![2]));

        let cow = evaluate(Language::Cow, "MoO MoO", &opts).unwrap();
        assert_eq!(cow.state, FinalState::Tape(vec![2]));

        let bef = evaluate(Language::Befunge, "34+.@", &opts).unwrap();
        assert_eq!(bef.output, "7 ");
        assert_eq!(bef.state, FinalState::Stack(vec![]));

        let ws = evaluate(Language::Whitespace, "   \t \t\n\t\n \t", &opts).unwrap();
        assert_eq!(ws.output, "5");
        assert_eq!(ws.state, FinalState::None);
    }

    #[test]
    fn language_names_and_aliases() {
        assert_eq!("bf".parse::<Language>(), Ok(Language::Brainfuck));
        assert_eq!("MOO".parse::<Language>(), Ok(Language::Cow));
        assert_eq!("befunge-93".parse::<Language>(), Ok(Language::Befunge));
        assert_eq!("ws".parse::<Language>(), Ok(Language::Whitespace));
        assert!("piet".parse::<Language>().is_err());
        for lang in Language::ALL {
            assert_eq!(lang.name().parse::<Language>(), Ok(lang));
            assert_eq!(lang.virtual_name(), format!("<{lang}>"));
        }
        assert_eq!(Language::from_extension("B93"), Some(Language::Befunge));
        assert_eq!(Language::from_extension("txt"), None);
    }

    #[test]
    fn diagnostics_use_the_engine_virtual_name() {
        let err = evaluate(Language::Befunge, "123", &Options::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoTermination);
        assert_eq!(err.locator.filename, "<befunge>");
    }

    #[test]
    fn evaluation_serializes_state_with_its_kind() {
        let run = evaluate(Language::Befunge, "12@", &Options::new()).unwrap();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["language"], "befunge");
        assert_eq!(json["state"]["kind"], "stack");
        assert_eq!(json["state"]["values"], serde_json::json!([1, 2]));
    }

    #[test]
    fn cancelled_token_stops_every_engine() {
        let token = CancelToken::new();
        token.cancel();
        let opts = Options::new().cancel(token);
        let sources = [
            (Language::Brainfuck, "+"),
            (Language::Cow, "MoO"),
            (Language::Befunge, "@"),
            (Language::Whitespace, "\n\n\n"),
        ];
        for (lang, src) in sources {
            let err = evaluate(lang, src, &opts).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Cancelled, "{lang}");
        }
    }

    #[test]
    fn elapsed_timeout_is_reported() {
        let opts = Options::new().timeout(std::time::Duration::ZERO);
        let err = evaluate(Language::Brainfuck, "+[]", &opts).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TimedOut);
        assert_eq!(err.category(), diagnostic::Category::ResourceExhaustion);
    }

    #[test]
    fn unrepresentable_timeout_runs_unbounded() {
        let opts = Options::new().timeout(std::time::Duration::MAX);
        let run = evaluate(Language::Brainfuck, "++.", &opts).unwrap();
        assert_eq!(run.state, FinalState::Tape(vec![2]));
    }

    #[test]
    fn engines_run_on_separate_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let src = "+".repeat(i + 1) + ".";
                    evaluate(Language::Brainfuck, &src, &Options::new()).unwrap().state
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), FinalState::Tape(vec![i as u8 + 1]));
        }
    }
}
