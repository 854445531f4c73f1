use std::collections::VecDeque;
use std::fmt::Display;
use std::io::BufRead;
use std::io::StdinLock;
use std::io::Stdout;
use std::io::Write;

use log::warn;

/// The decision of a [`ChoiceProvider`] when presented with a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Choice {
    /// Remove the constraint at the given position of the presented conflict.
    Remove(usize),
    /// Stop the diagnosis.
    Abort,
}

/// Decides which constraint of a conflict should be removed during a
/// [`DiagnosisSession`](super::DiagnosisSession).
pub trait ChoiceProvider<C> {
    /// Chooses a constraint of the `conflict` to remove; `removed` contains the constraints which
    /// were removed earlier, in removal order.
    fn present(&mut self, conflict: &[&C], removed: &[&C]) -> Choice;
}

/// Lets a user choose on a console.
///
/// The conflict is printed as a numbered list, followed by the constraints removed so far. The user
/// is then asked for the index of the constraint to remove. Empty and unparsable lines, and indices
/// outside the conflict, lead to the question being asked again; a negative number or the end of
/// the input aborts.
#[derive(Debug)]
pub struct ConsoleChoice<R, W> {
    input: R,
    output: W,
}

impl ConsoleChoice<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        ConsoleChoice::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleChoice<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsoleChoice { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(
        &mut self,
        conflict: &[&impl Display],
        removed: &[&impl Display],
    ) -> std::io::Result<Choice> {
        writeln!(self.output, "Constraints in conflict:")?;
        for (index, constraint) in conflict.iter().enumerate() {
            writeln!(self.output, "{index}. {constraint}")?;
        }
        writeln!(self.output, "and already removed constraints:")?;
        for constraint in removed {
            writeln!(self.output, "- {constraint}")?;
        }

        let mut line = String::new();
        loop {
            write!(self.output, "Choose a constraint to remove (-1 to exit): ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Choice::Abort);
            }

            let answer = line.trim();
            if answer.is_empty() {
                continue;
            }

            match answer.parse::<i64>() {
                Ok(index) if index < 0 => return Ok(Choice::Abort),
                Ok(index) => match usize::try_from(index) {
                    Ok(index) if index < conflict.len() => return Ok(Choice::Remove(index)),
                    _ => writeln!(self.output, "There is no constraint with index {index}")?,
                },
                Err(_) => writeln!(self.output, "'{answer}' is not an index")?,
            }
        }
    }
}

impl<C: Display, R: BufRead, W: Write> ChoiceProvider<C> for ConsoleChoice<R, W> {
    fn present(&mut self, conflict: &[&C], removed: &[&C]) -> Choice {
        match self.ask(conflict, removed) {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Could not interact with the console, aborting: {e}");
                Choice::Abort
            }
        }
    }
}

/// Replays a fixed sequence of choices; once the sequence is exhausted, every further conflict is
/// answered with the fallback choice.
///
/// The text of every presented conflict is recorded.
#[derive(Clone, Debug)]
pub struct ScriptedChoice {
    choices: VecDeque<Choice>,
    fallback: Choice,
    presented: Vec<Vec<String>>,
}

impl ScriptedChoice {
    /// Makes the given choices in order, and aborts afterwards.
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        ScriptedChoice {
            choices: choices.into_iter().collect(),
            fallback: Choice::Abort,
            presented: vec![],
        }
    }

    /// Makes the same choice for every conflict.
    pub fn always(choice: Choice) -> Self {
        ScriptedChoice {
            choices: VecDeque::new(),
            fallback: choice,
            presented: vec![],
        }
    }

    /// The conflicts which have been presented so far.
    pub fn presented(&self) -> &[Vec<String>] {
        &self.presented
    }
}

impl<C: Display> ChoiceProvider<C> for ScriptedChoice {
    fn present(&mut self, conflict: &[&C], _: &[&C]) -> Choice {
        self.presented.push(
            conflict
                .iter()
                .map(|constraint| constraint.to_string())
                .collect(),
        );

        self.choices.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(input: &str, conflict: &[&str], removed: &[&str]) -> (Choice, String) {
        let mut console = ConsoleChoice::new(input.as_bytes(), Vec::new());
        let conflict = conflict.iter().collect::<Vec<_>>();
        let removed = removed.iter().collect::<Vec<_>>();

        let choice = console.present(&conflict, &removed);
        let output = String::from_utf8(console.into_output()).expect("output is valid utf8");

        (choice, output)
    }

    #[test]
    fn console_prints_the_conflict_and_the_history() {
        let (choice, output) = ask("1\n", &["x == 1", "x == 2"], &["y == 3"]);

        assert_eq!(choice, Choice::Remove(1));
        assert!(output.starts_with(
            "Constraints in conflict:\n0. x == 1\n1. x == 2\nand already removed constraints:\n- y == 3\n"
        ));
    }

    #[test]
    fn console_asks_again_on_invalid_input() {
        let (choice, output) = ask("\nabc\n7\n 0 \n", &["x == 1", "x == 2"], &[]);

        assert_eq!(choice, Choice::Remove(0));
        assert_eq!(
            output
                .matches("Choose a constraint to remove (-1 to exit): ")
                .count(),
            4
        );
        assert!(output.contains("'abc' is not an index"));
        assert!(output.contains("There is no constraint with index 7"));
    }

    #[test]
    fn console_aborts_on_negative_index_or_end_of_input() {
        assert_eq!(ask("-1\n", &["x == 1"], &[]).0, Choice::Abort);
        assert_eq!(ask("", &["x == 1"], &[]).0, Choice::Abort);
    }

    #[test]
    fn scripted_choices_are_replayed_then_abort() {
        let mut choices = ScriptedChoice::new([Choice::Remove(1)]);
        let conflict = ["a", "b"];
        let conflict = conflict.iter().collect::<Vec<_>>();

        assert_eq!(choices.present(&conflict, &[]), Choice::Remove(1));
        assert_eq!(choices.present(&conflict, &[]), Choice::Abort);
        assert_eq!(
            choices.presented(),
            &[
                vec!["a".to_owned(), "b".to_owned()],
                vec!["a".to_owned(), "b".to_owned()]
            ]
        );
    }
}
