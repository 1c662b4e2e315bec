use crate::error::{WheelError, WheelResult};
use crate::types::*;
use chrono::Local;
use std::{
    env,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("WHEEL_CONFIG_PATH") {
    return resolve_repo_path(&raw);
  }
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_flag_true(key: &str) -> bool {
  match env::var(key) {
    Ok(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    Err(_) => false,
  }
}

pub fn apply_env_defaults(mut config: WheelConfig) -> WheelConfig {
  if let Some(value) = env_default("WHEEL_ROSTER_PATH") {
    config.roster_path = value;
  }
  if let Some(value) = env_default("WHEEL_OVERLAY_ADDR") {
    config.overlay_addr = value;
  }
  if let Some(value) = env_default("WHEEL_PARTICIPANT_TAG") {
    config.participant_tag = value;
  }
  if config.rng_seed.is_none() {
    config.rng_seed = env_default("WHEEL_RNG_SEED").and_then(|raw| raw.parse::<u64>().ok());
  }
  if env_flag_true("WHEEL_NO_REINSTATEMENT") {
    config.reinstatement_enabled = false;
  }
  config
}

pub fn validate_config(config: &WheelConfig) -> WheelResult<()> {
  if config.timing.frame_count < 2 {
    return Err(WheelError::Config(format!(
      "timing.frameCount must be at least 2, got {}",
      config.timing.frame_count
    )));
  }
  if config.min_pool_size < MIN_TOURNAMENT_POOL {
    return Err(WheelError::Config(format!(
      "minPoolSize must be at least {MIN_TOURNAMENT_POOL}, got {}",
      config.min_pool_size
    )));
  }
  if !config.pointer_angle.is_finite() {
    return Err(WheelError::Config("pointerAngle must be a finite number".to_string()));
  }
  for (name, tag) in [
    ("participantTag", &config.participant_tag),
    ("eliminatedTag", &config.eliminated_tag),
    ("winnerTag", &config.winner_tag),
  ] {
    if normalize_tag(tag).is_empty() {
      return Err(WheelError::Config(format!("{name} must not be empty")));
    }
  }
  Ok(())
}

/// Read `path` without env overrides. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> WheelResult<WheelConfig> {
  if !path.is_file() {
    return Ok(WheelConfig::default());
  }
  let data = fs::read_to_string(path)
    .map_err(|e| WheelError::Config(format!("read config {}: {e}", path.display())))?;
  serde_json::from_str::<WheelConfig>(&data)
    .map_err(|e| WheelError::Config(format!("parse config {}: {e}", path.display())))
}

pub fn load_config_inner() -> WheelResult<WheelConfig> {
  let config = apply_env_defaults(load_config_from(&config_path())?);
  validate_config(&config)?;
  Ok(config)
}

pub fn save_config_to(path: &Path, config: WheelConfig) -> WheelResult<WheelConfig> {
  validate_config(&config)?;
  let payload = serde_json::to_string_pretty(&config)?;
  fs::write(path, payload)
    .map_err(|e| WheelError::Config(format!("write config {}: {e}", path.display())))?;
  Ok(config)
}

pub fn save_config_inner(config: WheelConfig) -> WheelResult<WheelConfig> {
  save_config_to(&config_path(), config)
}

/// First run: leave a config.json with every tunable spelled out.
pub fn ensure_config_file() {
  let path = config_path();
  if path.is_file() {
    return;
  }
  match save_config_inner(WheelConfig::default()) {
    Ok(_) => tracing::info!("wrote default config to {}", path.display()),
    Err(e) => tracing::warn!("could not write default config: {e}"),
  }
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64
}

pub fn logs_dir() -> PathBuf {
  repo_root().join("logs")
}

pub fn spin_log_path() -> PathBuf {
  logs_dir().join("spins.log")
}

/// Human readable trail of every spin, next to the tracing log.
pub fn append_spin_log(label: &str, payload: &str) {
  let dir = logs_dir();
  if fs::create_dir_all(&dir).is_err() {
    return;
  }
  let path = spin_log_path();
  let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
  let entry = format!("[{timestamp}] {label}\n{payload}\n\n");
  if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
    let _ = file.write_all(entry.as_bytes());
  }
}

pub fn normalize_tag(raw: &str) -> String {
  raw.trim().to_lowercase()
}

pub fn log_config_warnings(config: &WheelConfig) {
  let mut warnings = Vec::new();

  if !resolve_repo_path(&config.roster_path).is_file() {
    warnings.push(format!("roster file {} not found; no participants will be listed", config.roster_path));
  }
  if config.reinstatement_enabled && config.reinstatement_min_pool < MIN_REINSTATEMENT_POOL {
    warnings.push(format!(
      "reinstatementMinPool {} is below the usual {MIN_REINSTATEMENT_POOL}",
      config.reinstatement_min_pool
    ));
  }
  if config.timing.highlight_frames > config.timing.frame_count {
    warnings.push("highlightFrames exceeds frameCount; every frame will be highlighted".to_string());
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
