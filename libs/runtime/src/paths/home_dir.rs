use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("cannot determine platform home directory ({0} is not set)")]
    PlatformHomeUnavailable(&'static str),

    #[error("environment variable '{0}' referenced in home_dir is not set")]
    MissingEnvVar(String),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const PLATFORM_HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const PLATFORM_HOME_VAR: &str = "HOME";

fn platform_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(PLATFORM_HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::PlatformHomeUnavailable(PLATFORM_HOME_VAR))
}

fn env_var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static env-var regex"))
}

/// Replace `${VAR}` references with their environment values.
fn expand_env_vars(raw: &str) -> Result<String, HomeDirError> {
    let re = env_var_pattern();
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in re.captures_iter(raw) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&raw[last..whole.start()]);
        let value = std::env::var(name.as_str())
            .map_err(|_| HomeDirError::MissingEnvVar(name.as_str().to_string()))?;
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

/// Resolve the application home directory into an absolute path.
///
/// - `None` → `<platform home>/<default_subdir>`
/// - `~` / `~/...` → expanded against the platform home
/// - `${VAR}` references are expanded from the environment
/// - relative paths are joined with the current working directory
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured {
        None => platform_home()?.join(default_subdir),
        Some(raw) => {
            let expanded = expand_env_vars(raw.trim())?;
            if expanded == "~" {
                platform_home()?
            } else if let Some(rest) = expanded
                .strip_prefix("~/")
                .or_else(|| expanded.strip_prefix("~\\"))
            {
                platform_home()?.join(rest)
            } else {
                let p = PathBuf::from(expanded);
                if p.is_absolute() {
                    p
                } else {
                    std::env::current_dir()
                        .map_err(|source| HomeDirError::Create {
                            path: p.to_string_lossy().to_string(),
                            source,
                        })?
                        .join(p)
                }
            }
        }
    };

    if create {
        std::fs::create_dir_all(&path).map_err(|source| HomeDirError::Create {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
    }

    Ok(path)
}
