//! Prompt loop: ask for a city, show it, optionally save its charts.

use super::display;
use crate::app::AqiApp;
use crate::error::Result;
use colored::*;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use std::future::Future;
use std::io;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// What a line typed at the city prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum PromptAction {
    Quit,
    Empty,
    City(String),
}

pub fn parse_city_input(input: &str) -> PromptAction {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" => PromptAction::Empty,
        "quit" | "exit" | "q" => PromptAction::Quit,
        _ => PromptAction::City(trimmed.to_string()),
    }
}

fn interrupted(err: &dialoguer::Error) -> bool {
    matches!(err, dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted)
}

/// `Ok(None)` when the user pressed Ctrl-C.
fn prompt_city(theme: &ColorfulTheme) -> Result<Option<String>> {
    let input = Input::<String>::with_theme(theme)
        .with_prompt("Enter city name (or 'quit' to exit)")
        .allow_empty(true)
        .interact_text();
    match input {
        Ok(line) => Ok(Some(line)),
        Err(e) if interrupted(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn prompt_save(theme: &ColorfulTheme) -> Result<Option<bool>> {
    let answer = Confirm::with_theme(theme)
        .with_prompt("Save plots to files?")
        .default(false)
        .interact_opt();
    match answer {
        Ok(choice) => Ok(Some(choice.unwrap_or(false))),
        Err(e) if interrupted(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Latches the first Ctrl-C of the session so every later step can see it.
///
/// The prompts read Ctrl-C as a key press and report it themselves; this covers
/// the time spent fetching, printing and rendering.
struct CtrlC {
    fired: watch::Receiver<bool>,
}

impl CtrlC {
    fn new(fired: watch::Receiver<bool>) -> Self {
        Self { fired }
    }

    /// Installs one SIGINT listener for the rest of the session.
    fn listen() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, leaving interactive mode");
                    let _ = tx.send(true);
                },
                Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
            }
        });
        Self::new(rx)
    }

    fn fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// Resolves once Ctrl-C has been pressed. Never resolves if the listener is gone.
    async fn wait(&mut self) {
        loop {
            if *self.fired.borrow_and_update() {
                return;
            }
            if self.fired.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Runs `step` unless Ctrl-C was or is pressed first; `None` ends the loop.
async fn unless_interrupted<F: Future>(ctrl_c: &mut CtrlC, step: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = ctrl_c.wait() => None,
        output = step => Some(output),
    }
}

pub async fn run_interactive(app: &AqiApp) -> Result<()> {
    println!("{}", "Welcome to the AQI monitor!".cyan().bold());
    let theme = ColorfulTheme::default();
    let mut ctrl_c = CtrlC::listen();

    loop {
        if ctrl_c.fired() {
            break;
        }
        let line = match prompt_city(&theme)? {
            Some(line) => line,
            None => break,
        };
        let city = match parse_city_input(&line) {
            PromptAction::Quit => break,
            PromptAction::Empty => {
                println!("{}", "Please enter a valid city name.".yellow());
                continue;
            },
            PromptAction::City(city) => city,
        };

        info!("Interactive lookup for {}", city);
        let collected =
            match unless_interrupted(&mut ctrl_c, app.collect_visualization_data(&city)).await {
                Some(result) => result,
                None => break,
            };
        let data = match collected {
            Ok(data) => data,
            Err(e) => {
                error!("Lookup for {} failed: {}", city, e);
                display::print_error(&e);
                continue;
            },
        };

        display::print_city_info(&data.info, app.predictor().growth_rate());
        display::print_comparison(&data);

        let save = match prompt_save(&theme)? {
            Some(save) => save,
            None => break,
        };
        let rendered =
            match unless_interrupted(&mut ctrl_c, async { app.render_visualizations(&data, save) })
                .await
            {
                Some(result) => result,
                None => break,
            };
        match rendered {
            Ok(artifacts) => display::print_artifacts(&artifacts, app.visualizer().output_dir()),
            Err(e) => {
                error!("Rendering charts for {} failed: {}", city, e);
                display::print_error(&e);
            },
        }
        println!();
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}
