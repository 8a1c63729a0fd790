//!
//! sc_token — forge and inspect demo Session Credentials
//! -----------------------------------------------------
//! Produces unsigned (or HMAC-signed) credentials for poking at the edge gate
//! locally, and decodes the claims segment of an existing credential.
//!

use std::env;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use serde_json::json;
use studioconnect::auth::credential::{decode_claims, forge, forge_signed};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} forge <role> [--sub <id>] [--days <N>] [--key <secret>]\n  {program} inspect <credential>\n\nOptions:\n  --sub <id>       Subject claim (default: demo-user)\n  --days <N>       Expiry horizon in days (default: 7)\n  --key <secret>   Sign with HMAC-SHA256 under this key instead of the unsigned placeholder\n"
    );
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];

    if args.len() < 2 {
        print_usage(program);
        return Err(anyhow!("missing subcommand"));
    }

    match args[1].as_str() {
        "forge" => {
            if args.len() < 3 {
                print_usage(program);
                return Err(anyhow!("forge needs a role, e.g. 'Administrador' or 'Musico'"));
            }
            let role = args[2].clone();
            let mut sub = "demo-user".to_string();
            let mut days: i64 = 7;
            let mut key: Option<String> = None;

            let mut i = 3usize;
            while i < args.len() {
                match args[i].as_str() {
                    "--sub" => {
                        i += 1;
                        sub = args.get(i).cloned().ok_or_else(|| anyhow!("--sub needs a value"))?;
                    }
                    "--days" => {
                        i += 1;
                        days = args
                            .get(i)
                            .and_then(|s| s.parse().ok())
                            .ok_or_else(|| anyhow!("--days needs a number"))?;
                    }
                    "--key" => {
                        i += 1;
                        key = Some(args.get(i).cloned().ok_or_else(|| anyhow!("--key needs a value"))?);
                    }
                    other => {
                        print_usage(program);
                        return Err(anyhow!("unknown option: {}", other));
                    }
                }
                i += 1;
            }

            let horizon = Duration::try_days(days).ok_or_else(|| anyhow!("--days out of range"))?;
            let exp = (Utc::now() + horizon).timestamp();
            let claims = json!({"role": role, "sub": sub, "exp": exp});
            let token = match key {
                Some(k) => forge_signed(&claims, k.as_bytes()),
                None => forge(&claims),
            };
            println!("{token}");
        }
        "inspect" => {
            let credential = args.get(2).ok_or_else(|| anyhow!("inspect needs a credential"))?;
            let claims = decode_claims(credential).map_err(|e| anyhow!("credential does not decode: {}", e))?;
            println!("{}", serde_json::to_string_pretty(&claims.to_value())?);
        }
        other => {
            print_usage(program);
            return Err(anyhow!("unknown subcommand: {}", other));
        }
    }

    Ok(())
}
