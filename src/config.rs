//! Server configuration: defaults, overridden by `FOLIO_*` environment variables,
//! overridden by command-line flags.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::gateway::DEFAULT_EXCLUDES;

pub const HELP: &str = "folio-admin server

USAGE:
  folio_admin_server [--http-port N] [--bind ADDR] [--data-dir PATH] [--content-root PATH]
                     [--exclude a,b,c] [--admin-token TOKEN]

OPTIONS:
  --http-port N         HTTP API port (env: FOLIO_HTTP_PORT, default 7880)
  --bind ADDR           Bind address (env: FOLIO_BIND_ADDR, default 0.0.0.0)
  --data-dir PATH       Collection snapshots folder (env: FOLIO_DATA_DIR, default data)
  --content-root PATH   Root of the editable project tree (env: FOLIO_CONTENT_ROOT, default .)
  --exclude LIST        Extra comma-separated tree exclusions (env: FOLIO_EXCLUDES)
  --admin-token TOKEN   Require x-admin-token on every API call (env: FOLIO_ADMIN_TOKEN)
";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub content_root: PathBuf,
    /// Tree exclusions: defaults plus configured extras.
    pub excludes: Vec<String>,
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 7880,
            bind_addr: "0.0.0.0".to_string(),
            data_dir: PathBuf::from("data"),
            content_root: PathBuf::from("."),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            admin_token: None,
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()).map(|p| p.to_string()).collect()
}

fn parse_port(source: &str, v: &str) -> Result<u16> {
    v.trim().parse::<u16>().with_context(|| format!("invalid port in {source}: '{v}'"))
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<String>> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return match args.get(i + 1) {
                Some(v) if !v.starts_with("--") => Ok(Some(v.clone())),
                _ => bail!("flag {flag} expects a value"),
            };
        }
        if let Some(v) = args[i].strip_prefix(&format!("{flag}=")) {
            return Ok(Some(v.to_string()));
        }
        i += 1;
    }
    Ok(None)
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

impl ServerConfig {
    /// Resolve from the process environment and arguments (`args[0]` is the program).
    pub fn from_env_and_args(args: &[String]) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().filter(|(k, _)| k.starts_with("FOLIO_")).collect();
        Self::resolve(&env, args)
    }

    pub fn resolve(env: &HashMap<String, String>, args: &[String]) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env.get("FOLIO_HTTP_PORT") { cfg.http_port = parse_port("FOLIO_HTTP_PORT", v)?; }
        if let Some(v) = env.get("FOLIO_BIND_ADDR") { cfg.bind_addr = v.trim().to_string(); }
        if let Some(v) = env.get("FOLIO_DATA_DIR") { cfg.data_dir = PathBuf::from(v); }
        if let Some(v) = env.get("FOLIO_CONTENT_ROOT") { cfg.content_root = PathBuf::from(v); }
        if let Some(v) = env.get("FOLIO_EXCLUDES") { cfg.excludes.extend(split_list(v)); }
        if let Some(v) = env.get("FOLIO_ADMIN_TOKEN") { cfg.admin_token = Some(v.clone()); }

        if let Some(v) = flag_value(args, "--http-port")? { cfg.http_port = parse_port("--http-port", &v)?; }
        if let Some(v) = flag_value(args, "--bind")? { cfg.bind_addr = v; }
        if let Some(v) = flag_value(args, "--data-dir")? { cfg.data_dir = PathBuf::from(v); }
        if let Some(v) = flag_value(args, "--content-root")? { cfg.content_root = PathBuf::from(v); }
        if let Some(v) = flag_value(args, "--exclude")? { cfg.excludes.extend(split_list(&v)); }
        if let Some(v) = flag_value(args, "--admin-token")? { cfg.admin_token = Some(v); }

        cfg.admin_token = cfg.admin_token.filter(|t| !t.trim().is_empty());
        cfg.excludes.dedup();
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> String { format!("{}:{}", self.bind_addr, self.http_port) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn defaults_apply_without_input() {
        let cfg = ServerConfig::resolve(&HashMap::new(), &args(&["bin"])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.socket_addr(), "0.0.0.0:7880");
        assert!(cfg.excludes.contains(&"node_modules".to_string()));
    }

    #[test]
    fn flags_override_environment() {
        let mut env = HashMap::new();
        env.insert("FOLIO_HTTP_PORT".to_string(), "9000".to_string());
        env.insert("FOLIO_DATA_DIR".to_string(), "/var/folio".to_string());
        env.insert("FOLIO_EXCLUDES".to_string(), "coverage, .vercel".to_string());
        let cfg = ServerConfig::resolve(&env, &args(&["bin", "--http-port", "9100", "--content-root=/srv/site", "--admin-token", "s3cret"])).unwrap();
        assert_eq!(cfg.http_port, 9100);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/folio"));
        assert_eq!(cfg.content_root, PathBuf::from("/srv/site"));
        assert_eq!(cfg.admin_token.as_deref(), Some("s3cret"));
        assert!(cfg.excludes.contains(&"coverage".to_string()));
        assert!(cfg.excludes.contains(&".vercel".to_string()));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(ServerConfig::resolve(&HashMap::new(), &args(&["bin", "--http-port", "http"])).is_err());
        assert!(ServerConfig::resolve(&HashMap::new(), &args(&["bin", "--data-dir"])).is_err());
        let mut env = HashMap::new();
        env.insert("FOLIO_HTTP_PORT".to_string(), "70000".to_string());
        assert!(ServerConfig::resolve(&env, &args(&["bin"])).is_err());
    }

    #[test]
    fn blank_admin_token_disables_gate() {
        let mut env = HashMap::new();
        env.insert("FOLIO_ADMIN_TOKEN".to_string(), "  ".to_string());
        let cfg = ServerConfig::resolve(&env, &args(&["bin"])).unwrap();
        assert!(cfg.admin_token.is_none());
    }
}
