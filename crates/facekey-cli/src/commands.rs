//! CLI command implementations

use clap::{Parser, Subcommand};
use std::io::BufRead;
use zeroize::Zeroize;

use crate::client::{ClientError, FacekeyClient};

/// facekey - face and phone unlock for your workstation
#[derive(Parser)]
#[command(name = "facekey")]
#[command(about = "Admin client for the facekey unlock daemon")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to daemon socket
    #[arg(long)]
    pub socket: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show daemon status
    Status,

    /// Check the daemon is running
    Ping,

    /// Store the password typed at the login prompt
    SetPassword {
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Print the stored password
    ShowPassword,

    /// Type the stored password now
    TestUnlock,

    /// Print the phone pairing URL
    PairUrl,
}

/// Run the CLI
pub async fn run(cli: Cli) -> Result<(), ClientError> {
    let client = match cli.socket {
        Some(socket) => FacekeyClient::with_socket_path(socket.into()),
        None => FacekeyClient::new(),
    };

    match cli.command {
        Commands::Ping => match client.ping().await {
            Ok(version) => {
                println!("facekey daemon v{} is running", version);
            }
            Err(ClientError::DaemonNotRunning) => {
                println!("facekey daemon is not running");
                println!("Start it with: facekey-daemon");
                return Err(ClientError::DaemonNotRunning);
            }
            Err(e) => return Err(e),
        },

        Commands::Status => {
            let status = client.status().await?;

            match (&status.lan_ip, &status.server_addr) {
                (Some(ip), Some(addr)) => println!("Pairing server: {} (LAN {})", addr, ip),
                _ => println!("Pairing server: not running"),
            }
            println!("Enrolled faces: {}", status.enrolled_faces);
            println!(
                "Password: {}",
                if status.password_set { "set" } else { "not set" }
            );
            println!(
                "Face unlock: {}",
                if status.face_unlock {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "Camera: {}",
                if status.capture_running {
                    "watching"
                } else {
                    "idle"
                }
            );
        }

        Commands::SetPassword { password } => {
            let password = match password {
                Some(password) => password,
                None => read_password_line(std::io::stdin().lock())?,
            };
            let cleared = password.is_empty();
            client.set_password(password).await?;
            if cleared {
                println!("Password cleared");
            } else {
                println!("Password saved");
            }
        }

        Commands::ShowPassword => match client.show_password().await? {
            Some(mut password) => {
                println!("{}", password);
                password.zeroize();
            }
            None => println!("No password set"),
        },

        Commands::TestUnlock => {
            client.test_unlock().await?;
            println!("Unlock keystrokes sent");
        }

        Commands::PairUrl => {
            println!("{}", client.pairing_url().await?);
        }
    }

    Ok(())
}

/// One line without its line terminator
fn read_password_line(mut input: impl BufRead) -> Result<String, ClientError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_password() {
        let cli = Cli::try_parse_from(["facekey", "set-password", "--password", "pw"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SetPassword { password: Some(ref p) } if p == "pw"
        ));

        let cli = Cli::try_parse_from(["facekey", "--socket", "/tmp/x.sock", "pair-url"]).unwrap();
        assert_eq!(cli.socket.as_deref(), Some("/tmp/x.sock"));
        assert!(matches!(cli.command, Commands::PairUrl));
    }

    #[test]
    fn test_read_password_line() {
        let input = std::io::Cursor::new("s3cret \"x\"\r\nignored\n");
        assert_eq!(read_password_line(input).unwrap(), "s3cret \"x\"");

        let empty = std::io::Cursor::new("");
        assert_eq!(read_password_line(empty).unwrap(), "");
    }
}
