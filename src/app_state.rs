// Application state management

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::WagerConfig;
use crate::system::WagerSystem;
use crate::vault::Vault;

pub type SharedState = Arc<Mutex<AppState>>;

pub struct AppState {
    pub system: WagerSystem,
}

impl AppState {
    /// Build the engine from environment configuration. The mutex around
    /// this state is what makes every mutating operation a single atomic
    /// sequential step.
    pub fn from_env() -> Result<Self, String> {
        let config = WagerConfig::from_env()?;
        let vault = Vault::new(config.decimals);

        let genesis = std::env::var("WAGERBOOK_GENESIS_KEEPER")
            .unwrap_or_else(|_| "KEEPER_GENESIS".to_string());
        let endpoint = std::env::var("WAGERBOOK_GENESIS_ENDPOINT")
            .unwrap_or_else(|_| "tcp://localhost:4071".to_string());

        info!(genesis = %genesis, "starting wager system");
        Ok(Self {
            system: WagerSystem::new(config, vault, &genesis, &endpoint),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }
}
