use std::fmt;
use std::io::Cursor;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_polly::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_polly::operation::synthesize_speech::builders::SynthesizeSpeechFluentBuilder;
use aws_sdk_polly::operation::synthesize_speech::SynthesizeSpeechError;
use aws_sdk_polly::types::{OutputFormat, TextType, VoiceId};
use aws_sdk_polly::Client as PollyClient;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

use crate::error::BackendError;
use crate::{AudioStream, SynthesisBackend};

/// Parameters sent with every Polly request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollyConfig {
    /// Voice id (e.g. `"Brian"`, `"Amy"`, `"Joanna"`).
    pub voice: String,
    /// Output sample rate in Hz, as the service expects it (a string).
    pub sample_rate: String,
    pub output_format: String,
    pub region: String,
    /// Shared config profile. `None` = `default`.
    pub profile: Option<String>,
    /// Explicit keys; when both are set the credential chain is skipped.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Override the service endpoint (local mocks, VPC endpoints).
    pub endpoint_url: Option<String>,
}

impl Default for PollyConfig {
    fn default() -> Self {
        Self {
            voice: "Brian".to_string(),
            sample_rate: "22050".to_string(),
            output_format: "mp3".to_string(),
            region: "us-east-1".to_string(),
            profile: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint_url: None,
        }
    }
}

impl fmt::Debug for PollyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollyConfig")
            .field("voice", &self.voice)
            .field("sample_rate", &self.sample_rate)
            .field("output_format", &self.output_format)
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl PollyConfig {
    /// Static credentials from the explicit key fields, if any are set.
    fn explicit_credentials(&self) -> Result<Option<Credentials>, BackendError> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Ok(Some(Credentials::new(
                id,
                secret,
                self.session_token.clone(),
                None,
                "say",
            ))),
            (None, None) => Ok(None),
            _ => Err(BackendError::Credentials(
                "access_key_id and secret_access_key must be set together".to_string(),
            )),
        }
    }
}

/// Synthesis backend backed by the Amazon Polly `SynthesizeSpeech` API.
///
/// Built once and shared read-only by every pool worker. The SDK is async,
/// so the backend owns a small tokio runtime and each worker thread blocks on
/// its own request.
#[derive(Debug)]
pub struct PollyBackend {
    config: PollyConfig,
    client: PollyClient,
    runtime: Runtime,
}

impl PollyBackend {
    /// Resolve credentials and build the client.
    ///
    /// Explicit keys in `config` win. Otherwise the default AWS chain is used
    /// (environment, `~/.aws/config` and `~/.aws/credentials` for
    /// `config.profile`, instance roles). Finding no credentials at all is
    /// fatal for the caller.
    pub fn new(config: PollyConfig) -> Result<Self, BackendError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("say-polly")
            .build()?;

        let region = Region::new(config.region.clone());
        let mut builder = match config.explicit_credentials()? {
            Some(credentials) => aws_sdk_polly::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials),
            None => {
                let shared = runtime.block_on(load_shared_config(&config, region))?;
                aws_sdk_polly::config::Builder::from(&shared)
            }
        };
        if let Some(url) = &config.endpoint_url {
            builder = builder.endpoint_url(url);
        }

        log::info!(
            "Polly backend ready: voice {}, region {}",
            config.voice,
            config.region
        );
        Ok(Self {
            client: PollyClient::from_conf(builder.build()),
            config,
            runtime,
        })
    }

    pub fn config(&self) -> &PollyConfig {
        &self.config
    }

    fn request(&self, markup: &str) -> SynthesizeSpeechFluentBuilder {
        self.client
            .synthesize_speech()
            .text(markup)
            .text_type(TextType::Ssml)
            .voice_id(VoiceId::from(self.config.voice.as_str()))
            .output_format(OutputFormat::from(self.config.output_format.as_str()))
            .sample_rate(self.config.sample_rate.as_str())
    }
}

async fn load_shared_config(
    config: &PollyConfig,
    region: Region,
) -> Result<aws_config::SdkConfig, BackendError> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let shared = loader.load().await;

    let provider = shared.credentials_provider().ok_or_else(|| {
        BackendError::Credentials("no credential provider is configured".to_string())
    })?;
    provider
        .provide_credentials()
        .await
        .map_err(|err| BackendError::Credentials(DisplayErrorContext(&err).to_string()))?;
    Ok(shared)
}

impl SynthesisBackend for PollyBackend {
    fn synthesize(&self, markup: &str) -> Result<AudioStream, BackendError> {
        let request = self.request(markup);
        let audio = self.runtime.block_on(async move {
            let response = request.send().await.map_err(classify)?;
            response
                .audio_stream
                .collect()
                .await
                .map_err(|err| BackendError::Transport(err.to_string()))
        })?;
        Ok(Box::new(Cursor::new(audio.into_bytes())))
    }
}

fn classify(err: SdkError<SynthesizeSpeechError>) -> BackendError {
    match err {
        SdkError::ServiceError(context) => classify_service(context.into_err()),
        other => BackendError::Transport(DisplayErrorContext(&other).to_string()),
    }
}

fn classify_service(err: SynthesizeSpeechError) -> BackendError {
    let message = err.to_string();
    match err {
        SynthesizeSpeechError::TextLengthExceededException(_) => {
            BackendError::TextLengthExceeded(message)
        }
        SynthesizeSpeechError::InvalidSsmlException(_) => BackendError::InvalidSsml(message),
        SynthesizeSpeechError::InvalidSampleRateException(_) => {
            BackendError::InvalidSampleRate(message)
        }
        SynthesizeSpeechError::ServiceFailureException(_) => BackendError::ServiceFailure(message),
        SynthesizeSpeechError::LexiconNotFoundException(_) => {
            BackendError::LexiconNotFound(message)
        }
        SynthesizeSpeechError::MarksNotSupportedForFormatException(_)
        | SynthesizeSpeechError::SsmlMarksNotSupportedForTextTypeException(_) => {
            BackendError::MarksNotSupported(message)
        }
        other if other.code() == Some("ThrottlingException") => BackendError::Throttled(message),
        _ => BackendError::Rejected(message),
    }
}
