use thiserror::Error;

use crate::row::Row;
use crate::{EMAIL_SIZE, USERNAME_SIZE};

// Non-SQL statements like .exit are called “meta-commands”.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Constants,
    Unrecognized,
}

impl MetaCommand {
    pub fn parse(input: &str) -> Option<MetaCommand> {
        match input {
            ".exit" => Some(MetaCommand::Exit),
            ".constants" => Some(MetaCommand::Constants),
            _ => {
                if input.starts_with('.') {
                    Some(MetaCommand::Unrecognized)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),

    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,

    #[error("String is too long.")]
    StringTooLong,

    #[error("ID is out of range.")]
    IdOutOfRange,
}

impl Statement {
    pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
        let mut tokens = input.split_whitespace();
        match tokens.next() {
            Some("insert") => {
                let (Some(id), Some(username), Some(email), None) =
                    (tokens.next(), tokens.next(), tokens.next(), tokens.next())
                else {
                    return Err(PrepareError::SyntaxError);
                };
                prepare_insert(id, username, email)
            }
            Some("select") if tokens.next().is_none() => Ok(Statement::Select),
            Some("select") => Err(PrepareError::SyntaxError),
            _ => Err(PrepareError::UnrecognizedStatement(input.to_owned())),
        }
    }
}

fn prepare_insert(id: &str, username: &str, email: &str) -> Result<Statement, PrepareError> {
    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
    let id = i32::try_from(id).map_err(|_| PrepareError::IdOutOfRange)?;
    if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }
    Ok(Statement::Insert(Row::new(id, username, email)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Meta(MetaCommand),
    Statement(Result<Statement, PrepareError>),
}

impl Input {
    pub fn parse(input: &str) -> Input {
        if let Some(meta) = MetaCommand::parse(input) {
            Input::Meta(meta)
        } else {
            Input::Statement(Statement::prepare(input))
        }
    }
}
