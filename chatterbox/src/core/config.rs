use std::env;

use eyre::Result;
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug)]
pub struct Config {
    pub database_url: Box<str>,
    pub server_port: u16,
}

impl Config {
    pub fn get() -> &'static Self {
        CONFIG.get().expect("`Config::init` must be called first")
    }

    pub fn init() -> Result<()> {
        let config = Config {
            database_url: env_var("DATABASE_URL")?,
            server_port: env_var_or("SERVER_PORT", 5555)?,
        };

        if CONFIG.set(config).is_err() {
            warn!("CONFIG was already set");
        }

        Ok(())
    }
}

trait EnvKind: Sized {
    const EXPECTED: &'static str;

    fn from_str(s: String) -> Result<Self, String>;
}

macro_rules! env_kind {
    ($($ty:ty: |$arg:ident| $impl:block,)*) => {
        $(
            impl EnvKind for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_str($arg: String) -> Result<Self, String> {
                    $impl
                }
            }
        )*
    };
}

env_kind! {
    Box<str>: |s| { Ok(s.into_boxed_str()) },
    u16: |s| { s.parse().map_err(|_| s) },
}

fn env_var<T: EnvKind>(name: &str) -> Result<T> {
    let value = env::var(name).map_err(|_| eyre!("missing env variable `{name}`"))?;

    parse_env::<T>(name, value)
}

/// Same as [`env_var`] but falls back to `default` if the variable is unset.
fn env_var_or<T: EnvKind>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => parse_env::<T>(name, value),
        Err(_) => Ok(default),
    }
}

fn parse_env<T: EnvKind>(name: &str, value: String) -> Result<T> {
    T::from_str(value).map_err(|value| {
        eyre!(
            "failed to parse env variable `{name}={value}`; expected {expected}",
            expected = T::EXPECTED
        )
    })
}
