use super::parsing::{
    env_first, env_optional, env_or_default, is_supported_image_extension, parse_bool,
    parse_cors_origins, parse_environment, parse_positive_u64, parse_string_list, parse_temperature,
    parse_u16, parse_u32,
};
use super::types::{
    AccessSettings, ConfigError, CorsSettings, DatabaseSettings, DeepSeekSettings, GeminiSettings,
    GradingSettings, RuntimeSettings, S3Settings, ServerHost, ServerPort, ServerSettings, Settings,
    StorageSettings, TelemetrySettings,
};

const MAX_IMAGES_CEILING: u64 = 10;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADER_HOST", "0.0.0.0");
        let port = env_or_default("GRADER_PORT", "8000");

        let environment =
            parse_environment(env_optional("GRADER_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("GRADER_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let access_code = env_first(&["ACCESS_CODE", "ACCESS_PASSWORD"])
            .ok_or(ConfigError::MissingSecret("ACCESS_CODE"))?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "essay_grader");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "essay_grader");
        let database_url = env_optional("DATABASE_URL");

        let gemini = GeminiSettings {
            api_key: env_or_default("GEMINI_API_KEY", ""),
            base_url: env_or_default(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            ocr_model: env_or_default("GEMINI_OCR_MODEL", "gemini-1.5-flash"),
            grading_model: env_or_default("GEMINI_GRADING_MODEL", "gemini-1.5-flash"),
            temperature: parse_temperature(
                "GEMINI_TEMPERATURE",
                env_or_default("GEMINI_TEMPERATURE", "0.4"),
            )?,
        };

        let deepseek = DeepSeekSettings {
            api_key: env_or_default("DEEPSEEK_API_KEY", ""),
            base_url: env_or_default("DEEPSEEK_BASE_URL", "https://api.deepseek.com"),
            model: env_or_default("DEEPSEEK_MODEL", "deepseek-chat"),
            temperature: parse_temperature(
                "DEEPSEEK_TEMPERATURE",
                env_or_default("DEEPSEEK_TEMPERATURE", "0.5"),
            )?,
            max_tokens: parse_u32(
                "DEEPSEEK_MAX_TOKENS",
                env_or_default("DEEPSEEK_MAX_TOKENS", "4000"),
            )?,
        };

        let grading = GradingSettings {
            ocr_timeout_seconds: parse_positive_u64(
                "OCR_TIMEOUT_SECONDS",
                env_or_default("OCR_TIMEOUT_SECONDS", "60"),
            )?,
            grading_timeout_seconds: parse_positive_u64(
                "GRADING_TIMEOUT_SECONDS",
                env_or_default("GRADING_TIMEOUT_SECONDS", "180"),
            )?,
            record_drain_timeout_seconds: parse_positive_u64(
                "RECORD_DRAIN_TIMEOUT_SECONDS",
                env_or_default("RECORD_DRAIN_TIMEOUT_SECONDS", "10"),
            )?,
        };

        let storage = StorageSettings {
            max_upload_size_mb: parse_positive_u64(
                "MAX_UPLOAD_SIZE_MB",
                env_or_default("MAX_UPLOAD_SIZE_MB", "10"),
            )?,
            allowed_image_extensions: parse_string_list(
                env_optional("ALLOWED_IMAGE_EXTENSIONS"),
                &["jpg", "jpeg", "png", "webp"],
            ),
            max_images_per_request: parse_positive_u64(
                "MAX_IMAGES_PER_REQUEST",
                env_or_default("MAX_IMAGES_PER_REQUEST", "3"),
            )?,
            key_prefix: env_or_default("STORAGE_KEY_PREFIX", "essays")
                .trim_matches('/')
                .to_string(),
        };

        let s3 = S3Settings {
            endpoint: env_or_default("S3_ENDPOINT", "http://localhost:9000"),
            access_key: env_or_default("S3_ACCESS_KEY", ""),
            secret_key: env_or_default("S3_SECRET_KEY", ""),
            bucket: env_or_default("S3_BUCKET", "essay-grader"),
            region: env_or_default("S3_REGION", "auto"),
        };

        let log_level = env_or_default("GRADER_LOG_LEVEL", "info");
        let json = env_optional("GRADER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            access: AccessSettings { access_code },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            gemini,
            deepseek,
            grading,
            storage,
            s3,
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn access(&self) -> &AccessSettings {
        &self.access
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn gemini(&self) -> &GeminiSettings {
        &self.gemini
    }

    pub(crate) fn deepseek(&self) -> &DeepSeekSettings {
        &self.deepseek
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Upper bound for a whole grading request body: every image at the size
    /// limit plus a megabyte for the text fields and multipart framing.
    pub(crate) fn request_body_limit(&self) -> usize {
        let images = self.storage.max_upload_bytes() * self.storage.max_images_per_request;
        usize::try_from(images + 1024 * 1024).unwrap_or(usize::MAX)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_image_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }
        for extension in &self.storage.allowed_image_extensions {
            if !is_supported_image_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.storage.max_images_per_request > MAX_IMAGES_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "MAX_IMAGES_PER_REQUEST",
                value: self.storage.max_images_per_request.to_string(),
            });
        }

        if self.storage.key_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "STORAGE_KEY_PREFIX",
                value: String::from("<empty>"),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.gemini.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_API_KEY"));
        }

        if self.deepseek.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("DEEPSEEK_API_KEY"));
        }

        if !self.s3.is_configured() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}
