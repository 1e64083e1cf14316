//! Interactive credential prompt.
//!
//! Used only when `--real` is given and the environment does not carry a full
//! set of credentials. Answers are read as plain lines, so the terminal shows what
//! is typed, passwords included. Put secrets in the environment or `.env` to avoid
//! typing them here. Prompts go to stderr and never repeat an answer.

use std::io::{self, BufRead, Write};

use crate::config::{Credentials, FITBIT_REDIRECT_URI};
use crate::domain::DeviceKind;
use crate::error::AppError;

/// Ask for `device` credentials on the terminal.
pub fn prompt_for_credentials(device: DeviceKind) -> Result<Credentials, AppError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();
    read_credentials(device, &mut input, &mut output)
}

/// Prompt loop over arbitrary streams.
///
/// Fitbit accepts either an access token or, when the token is left blank, the
/// client id/secret/code triple for an authorization-code exchange.
pub fn read_credentials(
    device: DeviceKind,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Credentials, AppError> {
    match device {
        DeviceKind::FitbitSense => {
            let token = ask(input, output, "Fitbit access token (blank to use an authorization code): ", true)?;
            if !token.is_empty() {
                return Ok(Credentials::FitbitToken { access_token: token });
            }
            let client_id = ask(input, output, "Fitbit client id: ", false)?;
            let client_secret = ask(input, output, "Fitbit client secret: ", false)?;
            let code = ask(input, output, "Fitbit authorization code: ", false)?;
            let redirect = ask(input, output, &format!("Redirect URI [{FITBIT_REDIRECT_URI}]: "), true)?;
            Ok(Credentials::FitbitAuthCode {
                client_id,
                client_secret,
                code,
                redirect_uri: if redirect.is_empty() {
                    FITBIT_REDIRECT_URI.to_string()
                } else {
                    redirect
                },
            })
        }
        DeviceKind::Whoop => Ok(Credentials::Whoop {
            email: ask(input, output, "Whoop email: ", false)?,
            password: ask(input, output, "Whoop password: ", false)?,
        }),
    }
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, label: &str, allow_empty: bool) -> Result<String, AppError> {
    loop {
        write!(output, "{label}")
            .and_then(|()| output.flush())
            .map_err(|e| AppError::Io(format!("Failed to write prompt: {e}")))?;

        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .map_err(|e| AppError::Io(format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::Config(
                "No input received. Set the credentials in the environment or .env instead.".to_string(),
            ));
        }

        let value = line.trim();
        if !value.is_empty() || allow_empty {
            return Ok(value.to_string());
        }
        writeln!(output, "A value is required.").map_err(|e| AppError::Io(format!("Failed to write prompt: {e}")))?;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run(device: DeviceKind, answers: &str) -> Result<Credentials, AppError> {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        read_credentials(device, &mut input, &mut output)
    }

    #[test]
    fn fitbit_token_short_circuits() {
        let creds = run(DeviceKind::FitbitSense, "abc123\n").unwrap();
        assert_eq!(creds, Credentials::FitbitToken { access_token: "abc123".into() });
    }

    #[test]
    fn fitbit_blank_token_asks_for_code_exchange() {
        let creds = run(DeviceKind::FitbitSense, "\nid\nsecret\ncode\n\n").unwrap();
        assert_eq!(
            creds,
            Credentials::FitbitAuthCode {
                client_id: "id".into(),
                client_secret: "secret".into(),
                code: "code".into(),
                redirect_uri: FITBIT_REDIRECT_URI.into(),
            }
        );
    }

    #[test]
    fn whoop_reprompts_on_blank_values() {
        let creds = run(DeviceKind::Whoop, "\n me@example.com \npw\n").unwrap();
        assert_eq!(
            creds,
            Credentials::Whoop {
                email: "me@example.com".into(),
                password: "pw".into(),
            }
        );
    }

    #[test]
    fn prompts_do_not_repeat_the_password() {
        let mut input = Cursor::new(b"me@example.com\nhunter2\n".to_vec());
        let mut output = Vec::new();
        read_credentials(DeviceKind::Whoop, &mut input, &mut output).unwrap();
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown, "Whoop email: Whoop password: ");
    }

    #[test]
    fn end_of_input_is_a_config_error() {
        assert!(matches!(run(DeviceKind::Whoop, "me@example.com\n"), Err(AppError::Config(_))));
    }
}
