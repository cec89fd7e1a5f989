use std::{fmt, sync::Arc};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{InquireError, Password, Select, Text, error::InquireResult, list_option::ListOption};
use tenki_core::{
    Config, Coordinates, LocationProvider, LocationSensor, PresentationController, ProviderId,
    WeatherProvider, location::FixedSensor,
    provider::{default_provider_from_config, provider_from_config},
};

use crate::view::TerminalView;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "tenki", version, about = "Weather widget for the terminal")]
pub struct Cli {
    /// Weather backend to use instead of the configured default.
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// More log output on stderr (-v, -vv). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `widget`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive widget: locate on start, then re-fetch or search from a menu.
    Widget,

    /// Show weather for the current position.
    Here {
        /// Latitude to use instead of the configured sensor.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude to use instead of the configured sensor.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Search a place by name and show its weather.
    Search {
        /// Place name, e.g. "Kyoto".
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Configure credentials for a specific provider and make it the default.
    Configure {
        /// Provider short name, e.g. "open-meteo" or "openweather".
        #[arg(value_name = "PROVIDER")]
        name: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        let provider = self.provider.as_deref();

        match self.command.unwrap_or(Command::Widget) {
            Command::Configure { name } => configure(&mut config, &name).await,
            Command::Here { lat, lon } => {
                let sensor: Arc<dyn LocationSensor> = match (lat, lon) {
                    (Some(lat), Some(lon)) => Arc::new(FixedSensor(Coordinates::new(lat, lon))),
                    _ => config.sensor.build_sensor()?,
                };
                build_controller(&config, provider, sensor)?.locate().await;
                Ok(())
            }
            Command::Search { query } => {
                let sensor = config.sensor.build_sensor()?;
                let controller = build_controller(&config, provider, sensor)?;
                search_and_pick(&controller, &query.join(" ")).await
            }
            Command::Widget => {
                let sensor = config.sensor.build_sensor()?;
                let controller = build_controller(&config, provider, sensor)?;
                widget(&controller).await
            }
        }
    }
}

fn build_controller(
    config: &Config,
    provider: Option<&str>,
    sensor: Arc<dyn LocationSensor>,
) -> anyhow::Result<PresentationController> {
    let weather: Arc<dyn WeatherProvider> = match provider {
        Some(name) => Arc::from(provider_from_config(ProviderId::try_from(name)?, config)?),
        None => Arc::from(default_provider_from_config(config)?),
    };
    tracing::debug!(
        provider = provider.unwrap_or("configured default"),
        "Using weather provider"
    );

    let geocoder = config.geocoder();
    let options = config.sensor.position_options();
    let location = LocationProvider::new(sensor, options, geocoder.clone());
    let view = Arc::new(TerminalView::default());

    Ok(PresentationController::new(weather, geocoder, location, view))
}

/// Runs a blocking `inquire` prompt off the async runtime.
async fn prompt<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> InquireResult<T> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(f).await.context("Prompt task failed")??;
    Ok(answer)
}

async fn search_and_pick(controller: &PresentationController, query: &str) -> anyhow::Result<()> {
    controller.search(query).await;

    let labels: Vec<String> =
        controller.state().candidates.iter().map(|c| c.label().to_string()).collect();

    if labels.is_empty() {
        return Ok(());
    }

    let answer = prompt(move || {
        picked_index(Select::new("場所を選択してください：", labels).raw_prompt())
    })
    .await?;

    if let Some(index) = answer {
        controller.select_candidate(index).await;
    }
    Ok(())
}

/// Index of the chosen candidate; `None` when the user backed out of the list.
fn picked_index(answer: InquireResult<ListOption<String>>) -> InquireResult<Option<usize>> {
    match answer {
        Ok(option) => Ok(Some(option.index)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy)]
enum MenuItem {
    Locate(&'static str),
    Search,
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Locate(label) => f.write_str(label),
            MenuItem::Search => f.write_str("場所を検索"),
            MenuItem::Quit => f.write_str("終了"),
        }
    }
}

async fn widget(controller: &PresentationController) -> anyhow::Result<()> {
    controller.locate().await;

    loop {
        let trigger = controller.trigger();
        let mut items = Vec::with_capacity(3);
        if trigger.is_enabled() {
            items.push(MenuItem::Locate(trigger.label()));
        }
        items.push(MenuItem::Search);
        items.push(MenuItem::Quit);

        let choice =
            prompt(move || Select::new("操作を選んでください：", items).prompt_skippable()).await?;

        match choice {
            Some(MenuItem::Locate(_)) => controller.locate().await,
            Some(MenuItem::Search) => {
                let query = prompt(|| Text::new("地名：").prompt_skippable()).await?;
                if let Some(query) = query {
                    search_and_pick(controller, &query).await?;
                }
            }
            Some(MenuItem::Quit) | None => return Ok(()),
        }
    }
}

async fn configure(config: &mut Config, provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    if id.requires_api_key() {
        let message = format!("{id} API key:");
        let key = prompt(move || Password::new(&message).without_confirmation().prompt()).await?;
        let key = key.trim();
        if key.is_empty() {
            bail!("API key for '{id}' must not be empty.");
        }
        config.upsert_provider_api_key(id, key.to_string());
    }

    config.set_default_provider(id);
    config.save()?;

    println!(
        "Saved '{id}' as the default provider in {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_widget() {
        let cli = Cli::try_parse_from(["tenki"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn here_accepts_negative_coordinates() {
        let cli =
            Cli::try_parse_from(["tenki", "here", "--lat", "-33.87", "--lon", "151.21"]).unwrap();
        match cli.command {
            Some(Command::Here { lat, lon }) => {
                assert_eq!(lat, Some(-33.87));
                assert_eq!(lon, Some(151.21));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn here_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["tenki", "here", "--lat", "35.0"]).is_err());
    }

    #[test]
    fn search_joins_words_and_takes_global_flags() {
        let args = ["tenki", "search", "New", "York", "--provider", "openweather", "-vv"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.provider.as_deref(), Some("openweather"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Search { query }) => assert_eq!(query.join(" "), "New York"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn configure_takes_provider_name() {
        let cli = Cli::try_parse_from(["tenki", "configure", "openweather"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Configure { name }) if name == "openweather"));
        assert!(cli.provider.is_none());
    }

    #[test]
    fn picked_candidate_resolves_to_its_index() {
        let answer = Ok(ListOption::new(1, "Kyotamba・Kyoto・Japan".to_string()));
        assert_eq!(picked_index(answer).unwrap(), Some(1));

        let only = Ok(ListOption::new(0, "Kyoto・Japan".to_string()));
        assert_eq!(picked_index(only).unwrap(), Some(0));
    }

    #[test]
    fn backing_out_of_the_candidate_list_picks_nothing() {
        assert_eq!(picked_index(Err(InquireError::OperationCanceled)).unwrap(), None);
        assert_eq!(picked_index(Err(InquireError::OperationInterrupted)).unwrap(), None);
    }

    #[test]
    fn other_prompt_failures_are_propagated() {
        let err = picked_index(Err(InquireError::NotTTY)).unwrap_err();
        assert!(matches!(err, InquireError::NotTTY));
    }

    #[test]
    fn menu_shows_trigger_wording() {
        assert_eq!(MenuItem::Locate("現在地の天気を再取得").to_string(), "現在地の天気を再取得");
    }
}
