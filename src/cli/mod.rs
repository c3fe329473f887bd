use std::io::{BufRead, Write};

use crate::{core::PackError, sql::Session};

/// Interactive loop: reads `CREATE TABLE` statements and prints them back with
/// their columns packed.
pub struct CliApp<I: BufRead, O: Write> {
    session: Session,

    input: I,
    output: O,
}

impl<I: BufRead, O: Write> CliApp<I, O> {
    pub fn new(session: Session, input: I, output: O) -> Self {
        Self {
            session,
            input,
            output,
        }
    }

    pub fn run(&mut self) -> Result<(), PackError> {
        self.bootstrap()?;

        let mut statement = String::new();
        let mut line_buf = String::new();
        loop {
            self.prompt(statement.is_empty())?;
            line_buf.clear();
            if self.input.read_line(&mut line_buf)? == 0 {
                return Ok(());
            }
            statement.push_str(&line_buf);

            // Statements may span several lines.
            if !line_buf.trim_end().ends_with(';') {
                continue;
            }
            let result = self.handle_statement(&statement);
            statement.clear();
            self.print(&result)?;
            self.print("\n")?;
        }
    }

    fn bootstrap(&mut self) -> Result<(), PackError> {
        let welcome = "Welcome to colpack!\n";
        self.print(welcome)?;
        Ok(())
    }

    fn prompt(&mut self, fresh: bool) -> Result<(), PackError> {
        let prompt = if fresh { "colpack=# " } else { "colpack-# " };
        self.print(prompt)
    }

    fn handle_statement(&mut self, statement: &str) -> String {
        match self.session.reorder_create_table(statement.trim()) {
            Ok(packed) => packed,
            Err(e) => e.to_string(),
        }
    }

    fn print(&mut self, string: &str) -> Result<(), PackError> {
        self.output.write_all(string.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }
}
