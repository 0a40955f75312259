//! Chat command - Sign in and converse interactively.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use orii_auth::{AuthError, AuthStateMachine, SimulatedDelays, SimulatedIdentityProvider, SimulatedOtpService};
use orii_chat::{ChatConfig, ChatError, ChatSession, IgnoreReason, Message, SendOutcome, SessionShell};

use super::api_client;

#[derive(Args)]
pub struct ChatArgs {
    /// Sign in with this phone number instead of choosing interactively
    #[arg(long)]
    pub phone: Option<String>,

    /// Sign in through the identity provider without prompting
    #[arg(long, conflicts_with = "phone")]
    pub provider: bool,

    /// Skip the simulated sign-in delays
    #[arg(long)]
    pub instant: bool,
}

type Input = Lines<BufReader<Stdin>>;

enum LoginChoice {
    Provider,
    Phone(Option<String>),
}

enum Attempt {
    SignedIn(Arc<ChatSession>),
    /// Back to the sign-in menu
    Restart,
    Quit,
}

enum Exit {
    Quit,
    SignedOut,
}

pub async fn execute(args: ChatArgs, config: ChatConfig) -> Result<()> {
    let delays = if args.instant {
        SimulatedDelays::instant()
    } else {
        SimulatedDelays::default()
    };
    let auth = AuthStateMachine::new(
        Arc::new(SimulatedIdentityProvider::new(delays)),
        Arc::new(SimulatedOtpService::new(delays)),
    );
    let client = Arc::new(api_client(&config));
    let mut shell = SessionShell::new(auth, client, config);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut preset = if args.provider {
        Some(LoginChoice::Provider)
    } else {
        args.phone.map(|number| LoginChoice::Phone(Some(number)))
    };

    println!("Welcome to {}", shell.config().assistant_name);
    loop {
        let Some(session) = sign_in(&mut shell, &mut input, preset.take()).await? else {
            return Ok(());
        };
        match converse(&mut shell, session, &mut input).await? {
            Exit::Quit => return Ok(()),
            Exit::SignedOut => println!("👋 Signed out."),
        }
    }
}

/// Returns `None` when the user quits or input ends.
async fn sign_in(
    shell: &mut SessionShell,
    input: &mut Input,
    mut preset: Option<LoginChoice>,
) -> Result<Option<Arc<ChatSession>>> {
    loop {
        let choice = match preset.take() {
            Some(choice) => choice,
            None => {
                println!();
                println!("Sign in to start your AI conversation:");
                println!("  [1] Continue with Google");
                println!("  [2] Phone number");
                println!("  [q] Quit");
                match read_prompt(input, "choice: ").await?.as_deref() {
                    None | Some("q") => return Ok(None),
                    Some("1") => LoginChoice::Provider,
                    Some("2") => LoginChoice::Phone(None),
                    Some(other) => {
                        println!("⚠️  Unknown option '{}'", other);
                        continue;
                    }
                }
            }
        };

        let attempt = match choice {
            LoginChoice::Provider => {
                println!("Signing in...");
                shell.login_with_provider().await.map(Attempt::SignedIn)
            }
            LoginChoice::Phone(number) => phone_sign_in(shell, input, number).await,
        };

        match attempt {
            Ok(Attempt::SignedIn(session)) => return Ok(Some(session)),
            Ok(Attempt::Restart) => continue,
            Ok(Attempt::Quit) => return Ok(None),
            Err(ChatError::Auth(e)) if recoverable(&e) => println!("⚠️  {}. Please try again.", e),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn phone_sign_in(
    shell: &mut SessionShell,
    input: &mut Input,
    number: Option<String>,
) -> Result<Attempt, ChatError> {
    let number = match number {
        Some(number) => number,
        None => match read_prompt(input, "Phone number: ").await? {
            Some(number) => number,
            None => return Ok(Attempt::Quit),
        },
    };

    println!("Sending OTP...");
    shell.submit_phone_number(&number).await?;
    println!("OTP sent to {}", number.trim());

    loop {
        let Some(code) = read_prompt(input, "Enter OTP ('back' to change number): ").await? else {
            return Ok(Attempt::Quit);
        };
        if code == "back" {
            shell.abandon_phone_login()?;
            return Ok(Attempt::Restart);
        }

        println!("Verifying...");
        match shell.submit_otp(&code).await {
            Ok(session) => return Ok(Attempt::SignedIn(session)),
            Err(ChatError::Auth(e)) if recoverable(&e) => println!("⚠️  {}", e),
            Err(e) => return Err(e),
        }
    }
}

fn recoverable(error: &AuthError) -> bool {
    error.is_retryable() || matches!(error, AuthError::EmptyInput { .. })
}

async fn converse(
    shell: &mut SessionShell,
    session: Arc<ChatSession>,
    input: &mut Input,
) -> Result<Exit> {
    if let Some(identity) = shell.identity() {
        info!(method = ?identity.auth_method, "Signed in");
    }
    println!();
    println!("Commands: /new  /logout  /quit   (Ctrl-C cancels a pending reply, or quits at the prompt)");
    for message in session.messages() {
        print_message(shell.config(), &message);
    }

    loop {
        let Some(line) = read_prompt(input, "> ").await? else {
            return Ok(Exit::Quit);
        };

        match line.as_str() {
            "/quit" => return Ok(Exit::Quit),
            "/logout" => {
                shell.sign_out()?;
                return Ok(Exit::SignedOut);
            }
            "/new" => {
                shell.new_chat()?;
                for message in session.messages() {
                    print_message(shell.config(), &message);
                }
                continue;
            }
            _ => {}
        }

        let send = session.send(&line);
        tokio::pin!(send);
        let outcome = tokio::select! {
            outcome = &mut send => outcome,
            _ = tokio::signal::ctrl_c() => {
                session.cancel_pending();
                send.await
            }
        };

        match outcome {
            SendOutcome::Completed { assistant, .. } => print_message(shell.config(), &assistant),
            SendOutcome::Ignored(IgnoreReason::EmptyInput) => {}
            SendOutcome::Ignored(reason) => println!("⚠️  Message not sent ({:?})", reason),
            SendOutcome::Discarded { .. } => println!("⚠️  Reply discarded"),
        }
    }
}

fn print_message(config: &ChatConfig, message: &Message) {
    let speaker = if message.is_user() {
        "You"
    } else {
        config.assistant_name.as_str()
    };
    println!("[{}] {}: {}", message.display_time(), speaker, message.text);
}

/// Trimmed next line, or `None` at end of input or on Ctrl-C.
///
/// Once a Ctrl-C listener exists the default SIGINT exit is gone, so every
/// prompt listens for it too.
async fn read_prompt(input: &mut Input, label: &str) -> std::io::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    next_line_or(input, interrupted).await
}

async fn next_line_or<R>(
    input: &mut Lines<R>,
    interrupted: impl Future<Output = ()>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = input.next_line() => Ok(line?.map(|line| line.trim().to_string())),
        _ = interrupted => {
            println!();
            Ok(None)
        }
    }
}
