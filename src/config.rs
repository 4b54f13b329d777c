/*!
Structs to hold configuration data and global variables.
*/
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::{
    auth,
    auth::TokenMint,
    store::{RegisterResult, Store},
};

#[derive(Deserialize)]
struct ConfigFile {
    db_connect_string: Option<String>,
    token_secret: Option<String>,
    token_ttl_minutes: Option<i64>,
    frontend_origin: Option<String>,
    default_admin_email: Option<String>,
    default_admin_password: Option<String>,
    default_admin_name: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug)]
pub struct Cfg {
    pub db_connect_string: String,
    pub token_secret: String,
    pub token_ttl_minutes: i64,
    pub frontend_origin: String,
    pub default_admin_email: String,
    pub default_admin_password: String,
    pub default_admin_name: String,
    pub addr: SocketAddr,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            db_connect_string: "host=localhost user=registrar_test password='registrar_test' dbname=registrar_test".to_owned(),
            token_secret: "not-a-deployable-secret".to_owned(),
            token_ttl_minutes: 60,
            frontend_origin: "http://localhost:3000".to_owned(),
            default_admin_email: "admin@example.com".to_owned(),
            default_admin_password: "password123".to_owned(),
            default_admin_name: "Admin User".to_owned(),
            addr: SocketAddr::new(
                "0.0.0.0".parse().unwrap(),
                8000
            ),
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        let cf: ConfigFile = toml::from_str(&file_contents)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.db_connect_string {
            c.db_connect_string = s;
        }
        if let Some(s) = cf.token_secret {
            c.token_secret = s;
        }
        if let Some(n) = cf.token_ttl_minutes {
            c.token_ttl_minutes = n;
        }
        if let Some(s) = cf.frontend_origin {
            c.frontend_origin = s;
        }
        if let Some(s) = cf.default_admin_email {
            c.default_admin_email = s;
        }
        if let Some(s) = cf.default_admin_password {
            c.default_admin_password = s;
        }
        if let Some(s) = cf.default_admin_name {
            c.default_admin_name = s;
        }
        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse().map_err(|e| format!(
                    "Error parsing {:?} as IP address: {}",
                    &s, &e
                ))?
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }

        Ok(c)
    }
}

/**
This guy will haul around some global variables and be passed in an
`axum::Extension` to the handlers who need him.

Everything process-wide lives here: the database connection factory, the
token mint with its signing secret, and the bits of configuration the
router assembly needs. Handlers never reach for globals.
*/
pub struct Glob {
    pub store: Store,
    pub mint: TokenMint,
    pub frontend_origin: String,
    pub addr: SocketAddr,
}

/// Loads system configuration and ensures all appropriate database tables
/// exist.
///
/// Also assures existence of the default admin account. A missing config
/// file isn't an error; the defaults serve.
pub async fn load_configuration<P: AsRef<Path>>(path: P) -> Result<Glob, String> {
    let path = path.as_ref();
    let cfg = if path.exists() {
        let cfg = Cfg::from_file(path)?;
        log::info!("Configuration file read:\n{:#?}", &cfg);
        cfg
    } else {
        log::warn!(
            "No config file at {}; running on default configuration.",
            path.display()
        );
        Cfg::default()
    };

    log::trace!("Checking state of DB...");
    let store = Store::new(cfg.db_connect_string.clone());
    if let Err(e) = store.ensure_db_schema().await {
        let estr = format!("Unable to ensure state of DB: {}", e.display());
        return Err(estr);
    }
    log::trace!("...DB okay.");

    log::trace!("Checking existence of default admin...");
    match store.admin_by_email(&cfg.default_admin_email).await {
        Err(e) => {
            let estr = format!(
                "Error attempting to check existence of default admin ({}): {}",
                &cfg.default_admin_email, e.display()
            );
            return Err(estr);
        },
        Ok(Some(_)) => {
            log::trace!("Default admin OK.");
        },
        Ok(None) => {
            log::info!(
                "Default admin ({}) doesn't exist; inserting.",
                &cfg.default_admin_email
            );
            let hash = auth::hash_password(&cfg.default_admin_password)?;
            match store.insert_admin(
                &cfg.default_admin_email,
                &hash,
                &cfg.default_admin_name,
            ).await {
                Err(e) => {
                    let estr = format!(
                        "Error inserting default admin: {}", e.display()
                    );
                    return Err(estr);
                },
                Ok(RegisterResult::DuplicateEmail) => {
                    log::warn!(
                        "Default admin ({}) appeared between check and insert.",
                        &cfg.default_admin_email
                    );
                },
                Ok(RegisterResult::Created(_)) => {
                    log::trace!("Default admin inserted.");
                },
            }
        },
    }

    let mint = TokenMint::new(&cfg.token_secret, cfg.token_ttl_minutes);

    let glob = Glob {
        store,
        mint,
        frontend_origin: cfg.frontend_origin,
        addr: cfg.addr,
    };

    Ok(glob)
}
