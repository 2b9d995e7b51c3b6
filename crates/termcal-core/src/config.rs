use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::parse_date;

pub const TERMS_FILE_KEY: &str =
  "terms.file";
pub const CALENDAR_START_KEY: &str =
  "calendar.start";
pub const CALENDAR_END_KEY: &str =
  "calendar.end";
pub const DEFAULT_COMMAND_KEY: &str =
  "default.command";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      TERMS_FILE_KEY.to_string(),
      "terms.json".to_string()
    );
    map.insert(
      DEFAULT_COMMAND_KEY.to_string(),
      "show".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(termcalrc = %path.display(), "loading termcalrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no termcalrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Unrecognised values are an error
  /// rather than `false`.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|raw| {
        parse_bool(raw).ok_or_else(|| {
          anyhow!(
            "invalid boolean value for \
             {key}: {raw}"
          )
        })
      })
      .transpose()
  }

  /// A `YYYY-MM-DD` value, if the key is
  /// set at all.
  pub fn get_date(
    &self,
    key: &str
  ) -> anyhow::Result<Option<NaiveDate>>
  {
    self
      .map
      .get(key)
      .map(|raw| {
        parse_date(key, raw).with_context(
          || {
            format!(
              "invalid config value for \
               {key}"
            )
          }
        )
      })
      .transpose()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let canonical = fs::canonicalize(&path)
      .unwrap_or_else(|_| path.clone());
    if self.loaded_files.contains(&canonical)
    {
      warn!(file = %path.display(), "rc file already loaded; skipping include cycle");
      return Ok(());
    }
    self
      .loaded_files
      .push(canonical);

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_relative_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let mut value =
        v.trim().to_string();
      if key == TERMS_FILE_KEY {
        value = resolve_relative_path(
          &base_dir, &value
        )?
        .to_string_lossy()
        .to_string();
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Flag beats config; a relative
/// `terms.file` set on the command line
/// resolves against the working directory.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_terms_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let path = if let Some(path) =
    override_path
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get(TERMS_FILE_KEY)
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    return Err(anyhow!(
      "no term file configured; set \
       {TERMS_FILE_KEY} or pass --terms"
    ));
  };

  if !path.exists() {
    warn!(file = %path.display(), "term file does not exist");
  }

  Ok(path)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TERMCALRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".termcalrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_relative_path(
  base_dir: &Path,
  raw: &str
) -> anyhow::Result<PathBuf> {
  if raw.trim().is_empty() {
    return Err(anyhow!(
      "path value cannot be empty"
    ));
  }

  let raw = PathBuf::from(raw);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
