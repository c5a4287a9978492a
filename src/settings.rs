//! User-configurable swap settings
//!
//! In-memory store with explicit persist/load against a JSON file, the
//! durable-storage analog of the browser original. Reads never block and
//! always produce a usable value; the priority fee is normalized to an
//! integer micro-SOL unit on disk.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Micro-units per SOL used for the persisted fee
pub const FEE_MICRO_PER_SOL: f64 = 1_000_000.0;

pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.5;
pub const DEFAULT_PRIORITY_FEE_SOL: f64 = 0.00005;
pub const DEFAULT_RELAY_TIP_THRESHOLD_SOL: f64 = 0.00001;

/// Current swap settings
#[derive(Debug, Clone, PartialEq)]
pub struct SwapSettings {
    /// Maximum acceptable slippage, percent
    pub slippage_pct: f64,
    /// Manually chosen priority fee, SOL
    pub priority_fee_sol: f64,
    /// Whether to auto-wrap the native asset before swapping
    pub wrap_native: bool,
    /// Submit through the bundle relay instead of direct broadcast
    pub use_bundled_relay: bool,
    /// Threshold used by automatic relay-fee estimation, SOL
    pub relay_tip_threshold_sol: f64,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            slippage_pct: DEFAULT_SLIPPAGE_PCT,
            priority_fee_sol: DEFAULT_PRIORITY_FEE_SOL,
            wrap_native: true,
            use_bundled_relay: true,
            relay_tip_threshold_sol: DEFAULT_RELAY_TIP_THRESHOLD_SOL,
        }
    }
}

/// On-disk representation; every field defaults so a partial or older
/// file still loads
#[derive(Debug, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default = "default_slippage")]
    slippage_pct: f64,
    /// Fee in integer micro-SOL units
    #[serde(default = "default_fee_micro")]
    priority_fee_micro: u64,
    #[serde(default = "default_true")]
    wrap_native: bool,
    #[serde(default = "default_true")]
    use_bundled_relay: bool,
    #[serde(default = "default_threshold")]
    relay_tip_threshold_sol: f64,
}

fn default_slippage() -> f64 {
    DEFAULT_SLIPPAGE_PCT
}
fn default_fee_micro() -> u64 {
    (DEFAULT_PRIORITY_FEE_SOL * FEE_MICRO_PER_SOL).round() as u64
}
fn default_true() -> bool {
    true
}
fn default_threshold() -> f64 {
    DEFAULT_RELAY_TIP_THRESHOLD_SOL
}

/// Settings store: synchronous in-memory reads, explicit persistence
pub struct SettingsStore {
    path: PathBuf,
    inner: RwLock<SwapSettings>,
}

impl SettingsStore {
    /// Create a store with defaults; does not touch the filesystem
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            inner: RwLock::new(SwapSettings::default()),
        }
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> SwapSettings {
        self.inner.read().clone()
    }

    pub fn set_slippage_pct(&self, value: f64) {
        self.inner.write().slippage_pct = value;
    }

    pub fn set_priority_fee_sol(&self, value: f64) {
        self.inner.write().priority_fee_sol = value;
    }

    pub fn set_wrap_native(&self, value: bool) {
        self.inner.write().wrap_native = value;
    }

    pub fn set_use_bundled_relay(&self, value: bool) {
        self.inner.write().use_bundled_relay = value;
    }

    pub fn set_relay_tip_threshold_sol(&self, value: f64) {
        self.inner.write().relay_tip_threshold_sol = value;
    }

    // Accessors below never surface an unusable value: non-finite or
    // negative numbers fall back to the defaults.

    pub fn slippage_pct(&self) -> f64 {
        sanitize(self.inner.read().slippage_pct, DEFAULT_SLIPPAGE_PCT)
    }

    pub fn priority_fee_sol(&self) -> f64 {
        sanitize(self.inner.read().priority_fee_sol, DEFAULT_PRIORITY_FEE_SOL)
    }

    pub fn wrap_native(&self) -> bool {
        self.inner.read().wrap_native
    }

    pub fn use_bundled_relay(&self) -> bool {
        self.inner.read().use_bundled_relay
    }

    pub fn relay_tip_threshold_sol(&self) -> f64 {
        sanitize(
            self.inner.read().relay_tip_threshold_sol,
            DEFAULT_RELAY_TIP_THRESHOLD_SOL,
        )
    }

    /// Write all fields to disk, normalizing the fee to micro units
    pub fn persist(&self) -> anyhow::Result<()> {
        let settings = self.get();
        let stored = StoredSettings {
            slippage_pct: settings.slippage_pct,
            priority_fee_micro: (settings.priority_fee_sol * FEE_MICRO_PER_SOL).round() as u64,
            wrap_native: settings.wrap_native,
            use_bundled_relay: settings.use_bundled_relay,
            relay_tip_threshold_sol: settings.relay_tip_threshold_sol,
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Read settings from disk. A missing file leaves the defaults in
    /// place; missing keys fall back individually.
    pub fn load(&self) -> anyhow::Result<()> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSettings = serde_json::from_str(&content)?;
        *self.inner.write() = SwapSettings {
            slippage_pct: stored.slippage_pct,
            priority_fee_sol: stored.priority_fee_micro as f64 / FEE_MICRO_PER_SOL,
            wrap_native: stored.wrap_native,
            use_bundled_relay: stored.use_bundled_relay,
            relay_tip_threshold_sol: stored.relay_tip_threshold_sol,
        };
        Ok(())
    }

    /// Resolve the fee to attach to the next quote request.
    ///
    /// With the bundle relay off this is the stored manual fee. With it
    /// on, a dynamic tip-floor estimate is fetched; any network or shape
    /// failure falls back to `fallback_sol` so a transient estimation
    /// outage never blocks swapping.
    pub async fn resolve_effective_fee(
        &self,
        http: &reqwest::Client,
        tip_floor_url: &str,
        fallback_sol: f64,
    ) -> f64 {
        if !self.use_bundled_relay() {
            return self.priority_fee_sol();
        }
        match fetch_tip_floor(http, tip_floor_url).await {
            Ok(tip) => tip,
            Err(e) => {
                tracing::warn!(error = %e, "tip floor estimation failed, using fallback");
                fallback_sol
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TipFloorResponse {
    #[serde(default)]
    success: bool,
    result: Option<TipFloorResult>,
}

#[derive(Debug, Deserialize)]
struct TipFloorResult {
    #[serde(default)]
    data: Vec<TipFloorEntry>,
}

#[derive(Debug, Deserialize)]
struct TipFloorEntry {
    landed_tips_75th_percentile: Option<f64>,
}

async fn fetch_tip_floor(http: &reqwest::Client, url: &str) -> anyhow::Result<f64> {
    let response: TipFloorResponse = http.get(url).send().await?.json().await?;
    if !response.success {
        anyhow::bail!("tip floor endpoint reported failure");
    }
    response
        .result
        .and_then(|r| r.data.first().and_then(|e| e.landed_tips_75th_percentile))
        .ok_or_else(|| anyhow::anyhow!("tip floor response missing 75th percentile"))
}

fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}
