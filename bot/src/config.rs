use std::{collections::BTreeMap, env, time::Duration};

use alloy::primitives::{Address, address};
use config::{Config, Environment, File};
use pilot_core::{backoff::BackoffConfig, chain::ChainConfig, classify::ErrorPatterns};
use pilot_executors::{gas::GasConfig, submitter::SubmitterConfig};
use pilot_http::{captcha::CaptchaConfig, client::HttpConfig, faucet::FaucetConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub logging: LoggingConfig,
    pub chain: ChainConfig,
    pub http: HttpConfig,
    pub backoff: BackoffConfig,
    pub gas: GasConfig,
    pub submitter: SubmitterConfig,
    pub error_patterns: ErrorPatterns,
    pub captcha: CaptchaConfig,
    pub faucet: FaucetConfig,
    pub steps: StepsConfig,
    pub cycle: CycleConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub private_keys: String,
    pub proxies: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            private_keys: "pk.txt".to_string(),
            proxies: "proxy.txt".to_string(),
        }
    }
}

/// Inclusive range of seconds to wait, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn sample(&self) -> Duration {
        let min_ms = self.min_secs.saturating_mul(1_000);
        let max_ms = self.max_secs.saturating_mul(1_000).max(min_ms);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min_secs > self.max_secs {
            return Err(ConfigError::invalid(field, "min_secs is greater than max_secs"));
        }
        Ok(())
    }
}

/// Inclusive integer range, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self) -> u32 {
        rand::rng().random_range(self.min..=self.max.max(self.min))
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::invalid(field, "min is greater than max"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub wallet_delay: DelayRange,
    pub cycle_hours: u64,
    pub countdown_log_interval_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            wallet_delay: DelayRange::new(5, 15),
            cycle_hours: 25,
            countdown_log_interval_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    /// Attempts per step before the wallet is abandoned.
    pub max_retries: u32,
    /// Gas price factor for replacing transactions left unconfirmed at the end of a wallet.
    pub replacement_gas_factor: f64,
    pub faucet: FaucetStepConfig,
    pub deploy: DeployStepConfig,
    pub transfer: TransferStepConfig,
    pub storage: StorageStepConfig,
    pub tokens: TokenStepConfig,
    pub mint: MintStepConfig,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            replacement_gas_factor: 1.2,
            faucet: FaucetStepConfig::default(),
            deploy: DeployStepConfig::default(),
            transfer: TransferStepConfig::default(),
            storage: StorageStepConfig::default(),
            tokens: TokenStepConfig::default(),
            mint: MintStepConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetStepConfig {
    pub enabled: bool,
    /// Captcha solves per step attempt.
    pub captcha_attempts: u32,
}

impl Default for FaucetStepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            captcha_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployStepConfig {
    pub enabled: bool,
}

impl Default for DeployStepConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferStepConfig {
    pub enabled: bool,
    pub amount_percentage: u64,
    pub gas_limit: u64,
}

impl Default for TransferStepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amount_percentage: 90,
            gas_limit: 21_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageNetwork {
    #[default]
    Turbo,
    Standard,
}

impl StorageNetwork {
    pub fn flow_contract(&self) -> Address {
        match self {
            StorageNetwork::Turbo => address!("bD2C3F0E65eDF5582141C35969d66e34629cC768"),
            StorageNetwork::Standard => address!("0460aA47b41a66694c0a73f667a1b795A5ED3556"),
        }
    }

    pub fn indexer_url(&self) -> &'static str {
        match self {
            StorageNetwork::Turbo => "https://indexer-storage-testnet-turbo.0g.ai",
            StorageNetwork::Standard => "https://indexer-storage-testnet-standard.0g.ai",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageStepConfig {
    pub enabled: bool,
    pub network: StorageNetwork,
    /// Overrides the network's indexer.
    pub indexer_url: Option<String>,
    /// Overrides the network's flow contract.
    pub flow_contract: Option<Address>,
    pub min_files: u32,
    pub max_files: u32,
    pub min_file_bytes: usize,
    pub max_file_bytes: usize,
    pub fee_gwei: f64,
    pub gas_limit: u64,
    pub upload_timeout_secs: u64,
    pub file_delay: DelayRange,
}

impl Default for StorageStepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            network: StorageNetwork::Turbo,
            indexer_url: None,
            flow_contract: None,
            min_files: 5,
            max_files: 10,
            min_file_bytes: 10,
            max_file_bytes: 200,
            // 0.00001 native token
            fee_gwei: 10_000.0,
            gas_limit: 500_000,
            upload_timeout_secs: 120,
            file_delay: DelayRange::new(1, 10),
        }
    }
}

impl StorageStepConfig {
    pub fn indexer_url(&self) -> String {
        self.indexer_url
            .clone()
            .unwrap_or_else(|| self.network.indexer_url().to_string())
    }

    pub fn flow_contract(&self) -> Address {
        self.flow_contract
            .unwrap_or_else(|| self.network.flow_contract())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub min_amount: f64,
    pub max_amount: f64,
    /// Decimal places kept when drawing a random amount.
    pub precision: u8,
    #[serde(default = "default_token_decimals")]
    pub decimals: u8,
}

fn default_token_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPair {
    pub from: String,
    pub to: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenStepConfig {
    pub enable_faucet: bool,
    pub enable_swap: bool,
    pub tokens: BTreeMap<String, TokenConfig>,
    pub faucet_tokens: Vec<String>,
    pub swap_pairs: Vec<SwapPair>,
    pub router: Address,
    pub pool_fee: u32,
    pub deadline_secs: u64,
    /// Attempts per claim or swap. Failures are logged and skipped.
    pub item_retries: u32,
    pub item_delay: DelayRange,
}

impl Default for TokenStepConfig {
    fn default() -> Self {
        let tokens = BTreeMap::from([
            (
                "USDT".to_string(),
                TokenConfig {
                    address: address!("9A87C2412d500343c073E5Ae5394E3bE3874F76b"),
                    min_amount: 0.01,
                    max_amount: 0.1,
                    precision: 4,
                    decimals: 18,
                },
            ),
            (
                "BTC".to_string(),
                TokenConfig {
                    address: address!("1E0D871472973c562650E991ED8006549F8CBEfc"),
                    min_amount: 0.000001,
                    max_amount: 0.00001,
                    precision: 6,
                    decimals: 18,
                },
            ),
            (
                "ETH".to_string(),
                TokenConfig {
                    address: address!("ce830D0905e0f7A9b300401729761579c5FB6bd6"),
                    min_amount: 0.00001,
                    max_amount: 0.0001,
                    precision: 5,
                    decimals: 18,
                },
            ),
        ]);

        let pair = |from: &str, to: &str, count| SwapPair {
            from: from.to_string(),
            to: to.to_string(),
            count,
        };

        Self {
            enable_faucet: true,
            enable_swap: true,
            tokens,
            faucet_tokens: vec!["USDT".into(), "BTC".into(), "ETH".into()],
            swap_pairs: vec![
                pair("USDT", "BTC", 2),
                pair("USDT", "ETH", 2),
                pair("BTC", "USDT", 1),
                pair("ETH", "USDT", 1),
            ],
            router: address!("D86b764618c6E3C078845BE3c3fCe50CE9535Da7"),
            pool_fee: 3_000,
            deadline_secs: 3_600,
            item_retries: 3,
            item_delay: DelayRange::new(5, 15),
        }
    }
}

impl TokenStepConfig {
    pub fn enabled(&self) -> bool {
        self.enable_faucet || self.enable_swap
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftContract {
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NftMintConfig {
    pub enabled: bool,
    pub contracts: Vec<NftContract>,
    pub count: CountRange,
    pub default_gas_limit: u64,
}

impl Default for NftMintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contracts: vec![NftContract {
                name: "Miner's Legacy".to_string(),
                address: address!("9059cA87Ddc891b91e731C57D21809F1A4adC8D9"),
            }],
            count: CountRange::new(1, 3),
            default_gas_limit: 160_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainMintConfig {
    pub enabled: bool,
    pub contract: Address,
    pub count: CountRange,
    pub name_length: CountRange,
    pub default_gas_limit: u64,
}

impl Default for DomainMintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contract: address!("CF7f37B4916AC5c530C863f8c8bB26Ec1e8d2Ccb"),
            count: CountRange::new(1, 2),
            name_length: CountRange::new(4, 8),
            default_gas_limit: 360_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MintStepConfig {
    pub nft: NftMintConfig,
    pub domain: DomainMintConfig,
    pub item_retries: u32,
    pub item_delay: DelayRange,
}

impl Default for MintStepConfig {
    fn default() -> Self {
        Self {
            nft: NftMintConfig::default(),
            domain: DomainMintConfig::default(),
            item_retries: 3,
            item_delay: DelayRange::new(5, 15),
        }
    }
}

impl MintStepConfig {
    pub fn enabled(&self) -> bool {
        self.nft.enabled || self.domain.enabled
    }
}

impl BotConfig {
    /// Rejects values that would make the bot misbehave rather than fail fast.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.rpc_urls.is_empty() {
            return Err(ConfigError::invalid("chain.rpc_urls", "at least one RPC url is required"));
        }
        if self.http.max_retries == 0 {
            return Err(ConfigError::invalid("http.max_retries", "must be at least 1"));
        }
        if self.steps.max_retries == 0 {
            return Err(ConfigError::invalid("steps.max_retries", "must be at least 1"));
        }
        if let (Some(min), Some(max)) = (self.gas.min_gwei, self.gas.max_gwei) {
            if min > max {
                return Err(ConfigError::invalid("gas", "min_gwei is greater than max_gwei"));
            }
        }
        if self.gas.multiplier <= 0.0 || self.gas.retry_increase < 1.0 {
            return Err(ConfigError::invalid(
                "gas",
                "multiplier must be positive and retry_increase at least 1",
            ));
        }
        if self.backoff.base_wait_ms > self.backoff.cap_ms {
            return Err(ConfigError::invalid("backoff", "base_wait_ms is greater than cap_ms"));
        }
        if self.steps.transfer.amount_percentage > 100 {
            return Err(ConfigError::invalid(
                "steps.transfer.amount_percentage",
                "must not exceed 100",
            ));
        }

        let storage = &self.steps.storage;
        if storage.min_files > storage.max_files {
            return Err(ConfigError::invalid("steps.storage", "min_files is greater than max_files"));
        }
        if storage.min_file_bytes == 0 || storage.min_file_bytes > storage.max_file_bytes {
            return Err(ConfigError::invalid(
                "steps.storage",
                "file size range must be non-empty and start above zero",
            ));
        }
        storage.file_delay.validate("steps.storage.file_delay")?;

        let tokens = &self.steps.tokens;
        for (symbol, token) in &tokens.tokens {
            if token.min_amount < 0.0 || token.min_amount > token.max_amount {
                return Err(ConfigError::invalid(
                    "steps.tokens.tokens",
                    format!("{symbol}: min_amount must be between 0 and max_amount"),
                ));
            }
            if token.precision > token.decimals {
                return Err(ConfigError::invalid(
                    "steps.tokens.tokens",
                    format!("{symbol}: precision exceeds token decimals"),
                ));
            }
        }
        for symbol in &tokens.faucet_tokens {
            if !tokens.tokens.contains_key(symbol) {
                return Err(ConfigError::invalid(
                    "steps.tokens.faucet_tokens",
                    format!("unknown token {symbol}"),
                ));
            }
        }
        for pair in &tokens.swap_pairs {
            for symbol in [&pair.from, &pair.to] {
                if !tokens.tokens.contains_key(symbol) {
                    return Err(ConfigError::invalid(
                        "steps.tokens.swap_pairs",
                        format!("unknown token {symbol}"),
                    ));
                }
            }
        }
        tokens.item_delay.validate("steps.tokens.item_delay")?;

        let mint = &self.steps.mint;
        mint.nft.count.validate("steps.mint.nft.count")?;
        mint.domain.count.validate("steps.mint.domain.count")?;
        mint.domain.name_length.validate("steps.mint.domain.name_length")?;
        if mint.nft.enabled && mint.nft.contracts.is_empty() {
            return Err(ConfigError::invalid(
                "steps.mint.nft.contracts",
                "at least one contract is required when NFT minting is enabled",
            ));
        }
        if mint.domain.name_length.min == 0 {
            return Err(ConfigError::invalid("steps.mint.domain.name_length", "must be at least 1"));
        }
        mint.item_delay.validate("steps.mint.item_delay")?;

        self.cycle.wallet_delay.validate("cycle.wallet_delay")?;
        if self.cycle.cycle_hours == 0 {
            return Err(ConfigError::invalid("cycle.cycle_hours", "must be at least 1"));
        }

        Ok(())
    }
}

/// Loads configuration, later sources overriding earlier ones:
/// compiled defaults, `configuration/bot_base.yaml`,
/// `configuration/bot_{APP_ENVIRONMENT}.yaml`, `config.{json,yaml,toml}` in the
/// working directory, then `APP__SECTION__KEY` environment variables.
pub fn get_config() -> Result<BotConfig, ConfigError> {
    let base_path = env::current_dir().map_err(|e| {
        ConfigError::invalid("working directory", format!("cannot determine current directory: {e}"))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());
    let environment_filename = format!("bot_{}.yaml", environment.to_lowercase());

    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("bot_base.yaml")).required(false))
        .add_source(File::from(configuration_directory.join(environment_filename)).required(false))
        .add_source(File::with_name(&base_path.join("config").to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix("app")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("chain.rpc_urls")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize::<BotConfig>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BotConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chain.chain_id, 16600);
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.steps.tokens.swap_pairs.len(), 4);
        assert_eq!(config.cycle.cycle_hours, 25);
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let mut config = BotConfig::default();
        config.gas.min_gwei = Some(10.0);
        config.gas.max_gwei = Some(1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "gas", .. })
        ));

        let mut config = BotConfig::default();
        config.steps.storage.min_files = 11;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.cycle.wallet_delay = DelayRange::new(15, 5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "cycle.wallet_delay",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_rpc_list_and_zero_retries() {
        let mut config = BotConfig::default();
        config.chain.rpc_urls.clear();
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.steps.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_swap_token() {
        let mut config = BotConfig::default();
        config.steps.tokens.swap_pairs.push(SwapPair {
            from: "USDT".into(),
            to: "DOGE".into(),
            count: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::builder()
            .add_source(File::from_str(
                "steps:\n  transfer:\n    amount_percentage: 50\nchain:\n  rotation_enabled: false\n",
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<BotConfig>()
            .unwrap();

        assert_eq!(config.steps.transfer.amount_percentage, 50);
        assert_eq!(config.steps.transfer.gas_limit, 21_000);
        assert!(!config.chain.rotation_enabled);
        assert_eq!(config.chain.rpc_urls.len(), 2);
    }

    #[test]
    fn test_delay_range_sampling() {
        let range = DelayRange::new(1, 2);
        for _ in 0..20 {
            let delay = range.sample();
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(2));
        }
        assert_eq!(DelayRange::new(0, 0).sample(), Duration::ZERO);
    }
}
