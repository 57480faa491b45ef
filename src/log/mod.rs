#![allow(unused_macros)]
use self::simple_logger::SimpleLogger;

mod simple_logger;

macro_rules! logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => (::log::log!(target: $target, ::log::Level::$rule_level, $d($d arg)+));
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        logger_macro!($name is $rule_level to $target, $);
    };
}

logger_macro!(user_error is Error to "shex::user");
logger_macro!(user_warn is Warn to "shex::user");
logger_macro!(user_info is Info to "shex::user");

macro_rules! dev_logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => {
                if std::cfg!(feature = "dev") {
                    (::log::log!(
                        target: $target,
                        ::log::Level::$rule_level,
                        "{}: {}",
                        std::panic::Location::caller(),
                        format_args!($d($d arg)+)
                    ));
                }
            };
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        dev_logger_macro!($name is $rule_level to $target, $);
    };
}

dev_logger_macro!(dev_error is Error to "shex::dev");
dev_logger_macro!(dev_warn is Warn to "shex::dev");
dev_logger_macro!(dev_info is Info to "shex::dev");
dev_logger_macro!(dev_debug is Debug to "shex::dev");

#[derive(Default)]
pub struct ShexLogger(Vec<(String, Box<dyn log::Log>)>);

impl ShexLogger {
    pub fn new(prefix: &'static str) -> Self {
        let mut logger: Self = Default::default();

        logger.add_logger("shex::user", SimpleLogger::to_stderr(prefix));

        #[cfg(feature = "dev")]
        {
            let path = option_env!("SHEX_DEV_LOGS")
                .map(|s| s.into())
                .unwrap_or_else(|| {
                    std::env::temp_dir().join(format!("shex-dev-{}.log", std::process::id()))
                });
            if let Ok(file_logger) = SimpleLogger::to_file(path, "") {
                logger.add_logger("shex::dev", file_logger);
            }
        }

        logger
    }

    pub fn into_global_logger(self) {
        log::set_boxed_logger(Box::new(self))
            .map(|()| log::set_max_level(log::LevelFilter::Trace))
            .expect("a global logger was already installed");
    }

    /// Add a logger for a specific target prefix to the stack
    fn add_logger(&mut self, prefix: &str, logger: impl log::Log + 'static) {
        let prefix = if prefix.ends_with("::") {
            prefix.to_string()
        } else {
            // given a prefix `my::prefix`, we want to match `my::prefix::somewhere`
            // but not `my::prefix_to_somewhere`
            format!("{prefix}::")
        };
        self.0.push((prefix, Box::new(logger)))
    }
}

impl log::Log for ShexLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        for (prefix, logger) in self.0.iter() {
            if record.target() == &prefix[..prefix.len() - 2] || record.target().starts_with(prefix)
            {
                logger.log(record);
            }
        }
    }

    fn flush(&self) {
        for (_, logger) in self.0.iter() {
            logger.flush();
        }
    }
}
