//! The license management context and its builder.
//!
//! A context is the immutable bundle of collaborators shared by every
//! manager built from it: codec, compression, encryption factory, clock,
//! password policy, authorization, repository context, and the
//! initialization/validation hooks with their composition modes.

use crate::auth::{AuthenticationFactory, StandardAuthenticationFactory};
use crate::authz::{Authorization, PermitAllAuthorization};
use crate::codec::Codec;
use crate::crypto::encrypt::EncryptionFactory;
use crate::errors::KeywrightError;
use crate::init::{DefaultInitialization, LicenseInitialization};
use crate::io::Transformation;
use crate::license::{License, LicenseFactory};
use crate::manager::{ConsumerBuilder, VendorBuilder};
use crate::passwd::{MinimumPasswordPolicy, PasswordPolicy};
use crate::repository::RepositoryContext;
use crate::validate::{DefaultValidation, LicenseValidation};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Source of "now" for issue dates, validity windows, and cache deadlines.
///
/// Licenses must not trust the system clock blindly: every time-dependent
/// decision in the engine reads the context's clock, so deployments can
/// substitute a hardened or deterministic source.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// The default clock: plain wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// How a user-supplied initialization or validation combines with the
/// built-in one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionComposition {
    /// Run the user function first, then the built-in one.
    #[default]
    Decorate,
    /// Run the user function only.
    Override,
}

struct Inner {
    authentication_factory: Arc<dyn AuthenticationFactory>,
    authorization: Arc<dyn Authorization>,
    cache_period: Duration,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn Codec>,
    compression: Arc<dyn Transformation>,
    encryption_algorithm: String,
    encryption_factory: Arc<dyn EncryptionFactory>,
    initialization: Option<Arc<dyn LicenseInitialization>>,
    initialization_composition: FunctionComposition,
    keystore_type: String,
    license_factory: Arc<dyn LicenseFactory>,
    password_policy: Arc<dyn PasswordPolicy>,
    repository_context: Arc<dyn RepositoryContext>,
    subject: String,
    validation: Option<Arc<dyn LicenseValidation>>,
    validation_composition: FunctionComposition,
}

/// Immutable bundle of configured collaborators.
///
/// Cheap to clone; every manager built from a context shares the same
/// underlying collaborators.
#[derive(Clone)]
pub struct LicenseContext {
    inner: Arc<Inner>,
}

impl LicenseContext {
    /// Opens a context builder.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Opens a builder for a vendor manager (generates license keys).
    pub fn vendor(&self) -> VendorBuilder {
        VendorBuilder::new(self.clone())
    }

    /// Opens a builder for a consumer manager (installs, loads, verifies,
    /// uninstalls license keys).
    pub fn consumer(&self) -> ConsumerBuilder {
        ConsumerBuilder::new(self.clone())
    }

    /// The product identifier licenses must carry.
    pub fn subject(&self) -> &str {
        &self.inner.subject
    }

    /// How long authentication results stay cached.
    ///
    /// A zero period means results are never cached.
    pub fn cache_period(&self) -> Duration {
        self.inner.cache_period
    }

    /// The current time according to the context clock.
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.inner.clock.now_utc()
    }

    /// A fresh license bean from the configured factory.
    pub fn license(&self) -> License {
        self.inner.license_factory.license()
    }

    /// The configured codec.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.inner.codec
    }

    /// The configured compression transformation.
    pub fn compression(&self) -> &Arc<dyn Transformation> {
        &self.inner.compression
    }

    /// The default encryption algorithm name.
    pub fn encryption_algorithm(&self) -> &str {
        &self.inner.encryption_algorithm
    }

    /// The configured encryption factory.
    pub fn encryption_factory(&self) -> &Arc<dyn EncryptionFactory> {
        &self.inner.encryption_factory
    }

    /// The configured authentication factory.
    pub fn authentication_factory(&self) -> &Arc<dyn AuthenticationFactory> {
        &self.inner.authentication_factory
    }

    /// The configured authorization.
    pub fn authorization(&self) -> &Arc<dyn Authorization> {
        &self.inner.authorization
    }

    /// The configured password policy.
    pub fn password_policy(&self) -> &Arc<dyn PasswordPolicy> {
        &self.inner.password_policy
    }

    /// The configured repository context.
    pub fn repository_context(&self) -> &Arc<dyn RepositoryContext> {
        &self.inner.repository_context
    }

    /// The default keystore type.
    pub fn keystore_type(&self) -> &str {
        &self.inner.keystore_type
    }

    /// The effective initialization: the built-in one, composed with the
    /// user hook per the configured composition mode.
    pub fn initialization(&self) -> Arc<dyn LicenseInitialization> {
        let second: Arc<dyn LicenseInitialization> =
            Arc::new(DefaultInitialization::new(self.clone()));
        match (&self.inner.initialization, self.inner.initialization_composition) {
            (None, _) => second,
            (Some(first), FunctionComposition::Override) => first.clone(),
            (Some(first), FunctionComposition::Decorate) => Arc::new(SequencedInitialization {
                first: first.clone(),
                second,
            }),
        }
    }

    /// The effective validation: the built-in one, composed with the user
    /// hook per the configured composition mode.
    pub fn validation(&self) -> Arc<dyn LicenseValidation> {
        let second: Arc<dyn LicenseValidation> = Arc::new(DefaultValidation::new(self.clone()));
        match (&self.inner.validation, self.inner.validation_composition) {
            (None, _) => second,
            (Some(first), FunctionComposition::Override) => first.clone(),
            (Some(first), FunctionComposition::Decorate) => Arc::new(SequencedValidation {
                first: first.clone(),
                second,
            }),
        }
    }
}

struct SequencedInitialization {
    first: Arc<dyn LicenseInitialization>,
    second: Arc<dyn LicenseInitialization>,
}

impl LicenseInitialization for SequencedInitialization {
    fn initialize(&self, bean: &mut License) {
        self.first.initialize(bean);
        self.second.initialize(bean);
    }
}

struct SequencedValidation {
    first: Arc<dyn LicenseValidation>,
    second: Arc<dyn LicenseValidation>,
}

impl LicenseValidation for SequencedValidation {
    fn validate(&self, bean: &License) -> Result<(), KeywrightError> {
        self.first.validate(bean)?;
        self.second.validate(bean)
    }
}

const DEFAULT_CACHE_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Fluent configuration for a [`LicenseContext`].
///
/// Required: codec, compression, encryption algorithm, encryption factory,
/// license factory, repository context, keystore type, subject. Everything
/// else has a default.
pub struct ContextBuilder {
    authentication_factory: Arc<dyn AuthenticationFactory>,
    authorization: Arc<dyn Authorization>,
    cache_period: Duration,
    clock: Arc<dyn Clock>,
    codec: Option<Arc<dyn Codec>>,
    compression: Option<Arc<dyn Transformation>>,
    encryption_algorithm: String,
    encryption_factory: Option<Arc<dyn EncryptionFactory>>,
    initialization: Option<Arc<dyn LicenseInitialization>>,
    initialization_composition: FunctionComposition,
    keystore_type: String,
    license_factory: Option<Arc<dyn LicenseFactory>>,
    password_policy: Arc<dyn PasswordPolicy>,
    repository_context: Option<Arc<dyn RepositoryContext>>,
    subject: String,
    validation: Option<Arc<dyn LicenseValidation>>,
    validation_composition: FunctionComposition,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            authentication_factory: Arc::new(StandardAuthenticationFactory),
            authorization: Arc::new(PermitAllAuthorization),
            cache_period: DEFAULT_CACHE_PERIOD,
            clock: Arc::new(SystemClock),
            codec: None,
            compression: None,
            encryption_algorithm: String::new(),
            encryption_factory: None,
            initialization: None,
            initialization_composition: FunctionComposition::Decorate,
            keystore_type: String::new(),
            license_factory: None,
            password_policy: Arc::new(MinimumPasswordPolicy),
            repository_context: None,
            subject: String::new(),
            validation: None,
            validation_composition: FunctionComposition::Decorate,
        }
    }
}

impl ContextBuilder {
    /// Sets the authentication factory (default: the Ed25519 notary).
    pub fn authentication_factory(mut self, factory: Arc<dyn AuthenticationFactory>) -> Self {
        self.authentication_factory = factory;
        self
    }

    /// Sets the authorization (default: permit all).
    pub fn authorization(mut self, authorization: Arc<dyn Authorization>) -> Self {
        self.authorization = authorization;
        self
    }

    /// Sets the cache period for authentication results (default: 30
    /// minutes; zero disables caching).
    pub fn cache_period(mut self, period: Duration) -> Self {
        self.cache_period = period;
        self
    }

    /// Sets the clock (default: wall clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the codec. Required.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the compression transformation. Required.
    pub fn compression(mut self, compression: Arc<dyn Transformation>) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Sets the default encryption algorithm name. Required, non-empty.
    pub fn encryption_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.encryption_algorithm = algorithm.into();
        self
    }

    /// Sets the encryption factory. Required.
    pub fn encryption_factory(mut self, factory: Arc<dyn EncryptionFactory>) -> Self {
        self.encryption_factory = Some(factory);
        self
    }

    /// Sets a user initialization hook.
    pub fn initialization(mut self, initialization: Arc<dyn LicenseInitialization>) -> Self {
        self.initialization = Some(initialization);
        self
    }

    /// Sets how the user initialization composes with the built-in one
    /// (default: decorate).
    pub fn initialization_composition(mut self, composition: FunctionComposition) -> Self {
        self.initialization_composition = composition;
        self
    }

    /// Sets the default keystore type. Required, non-empty.
    pub fn keystore_type(mut self, keystore_type: impl Into<String>) -> Self {
        self.keystore_type = keystore_type.into();
        self
    }

    /// Sets the license factory. Required.
    pub fn license_factory(mut self, factory: Arc<dyn LicenseFactory>) -> Self {
        self.license_factory = Some(factory);
        self
    }

    /// Sets the password policy (default: minimum strength).
    pub fn password_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.password_policy = policy;
        self
    }

    /// Sets the repository context. Required.
    pub fn repository_context(mut self, repository_context: Arc<dyn RepositoryContext>) -> Self {
        self.repository_context = Some(repository_context);
        self
    }

    /// Sets the subject licenses must carry. Required, non-empty.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets a user validation hook.
    pub fn validation(mut self, validation: Arc<dyn LicenseValidation>) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Sets how the user validation composes with the built-in one
    /// (default: decorate).
    pub fn validation_composition(mut self, composition: FunctionComposition) -> Self {
        self.validation_composition = composition;
        self
    }

    /// Builds the context, failing with [`KeywrightError::Config`] if a
    /// required field is absent or empty.
    pub fn build(self) -> Result<LicenseContext, KeywrightError> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T, KeywrightError> {
            value.ok_or_else(|| KeywrightError::Config(format!("{} is not set", name)))
        }
        fn non_empty(value: String, name: &str) -> Result<String, KeywrightError> {
            if value.is_empty() {
                Err(KeywrightError::Config(format!("{} must not be empty", name)))
            } else {
                Ok(value)
            }
        }

        Ok(LicenseContext {
            inner: Arc::new(Inner {
                authentication_factory: self.authentication_factory,
                authorization: self.authorization,
                cache_period: self.cache_period,
                clock: self.clock,
                codec: required(self.codec, "codec")?,
                compression: required(self.compression, "compression")?,
                encryption_algorithm: non_empty(
                    self.encryption_algorithm,
                    "encryption algorithm",
                )?,
                encryption_factory: required(self.encryption_factory, "encryption factory")?,
                initialization: self.initialization,
                initialization_composition: self.initialization_composition,
                keystore_type: non_empty(self.keystore_type, "keystore type")?,
                license_factory: required(self.license_factory, "license factory")?,
                password_policy: self.password_policy,
                repository_context: required(self.repository_context, "repository context")?,
                subject: non_empty(self.subject, "subject")?,
                validation: self.validation,
                validation_composition: self.validation_composition,
            }),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{builder_at, context_at};
    use super::*;
    use crate::license::License;
    use crate::validate::ValidationError;
    use chrono::TimeZone;

    const NOW: &str = "2026-03-01T12:00:00Z";

    #[test]
    fn build_fails_without_codec() {
        let result = LicenseContext::builder().subject("App").build();
        assert!(matches!(result, Err(KeywrightError::Config(_))));
    }

    #[test]
    fn build_fails_with_empty_subject() {
        let result = builder_at("App", NOW).subject("").build();
        assert!(matches!(result, Err(KeywrightError::Config(_))));
    }

    #[test]
    fn build_fails_with_empty_keystore_type() {
        let result = builder_at("App", NOW).keystore_type("").build();
        assert!(matches!(result, Err(KeywrightError::Config(_))));
    }

    #[test]
    fn context_clock_is_injected() {
        let context = context_at("App", NOW);
        assert_eq!(
            context.now_utc(),
            chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn system_clock_reads_wall_time() {
        let context = builder_at("App", NOW).clock(Arc::new(SystemClock)).build().unwrap();
        let before = chrono::Utc::now();
        let now = context.now_utc();
        assert!(now >= before && now <= chrono::Utc::now());
    }

    #[test]
    fn default_initialization_fills_unset_fields() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);

        assert_eq!(bean.consumer_type.as_deref(), Some("User"));
        assert_eq!(bean.holder.as_deref(), Some("CN=unknown"));
        assert_eq!(bean.issuer.as_deref(), Some("CN=App"));
        assert_eq!(bean.subject.as_deref(), Some("App"));
        assert_eq!(bean.issued, Some(context.now_utc()));
    }

    #[test]
    fn default_initialization_is_idempotent_on_full_beans() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        let first = bean.clone();
        context.initialization().initialize(&mut bean);
        assert_eq!(bean, first);
    }

    #[test]
    fn default_initialization_preserves_set_fields() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        bean.holder = Some("CN=Alice".to_string());
        context.initialization().initialize(&mut bean);
        assert_eq!(bean.holder.as_deref(), Some("CN=Alice"));
    }

    #[test]
    fn default_validation_accepts_initialized_bean() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        assert!(context.validation().validate(&bean).is_ok());
    }

    #[test]
    fn default_validation_rejects_nonpositive_amount() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        bean.consumer_amount = 0;
        assert!(matches!(
            context.validation().validate(&bean),
            Err(KeywrightError::Validation(
                ValidationError::ConsumerAmountNotPositive(0)
            ))
        ));
    }

    #[test]
    fn default_validation_rejects_expired_license() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        bean.not_after = Some(context.now_utc() - chrono::Duration::seconds(1));
        assert!(matches!(
            context.validation().validate(&bean),
            Err(KeywrightError::Validation(ValidationError::Expired(_)))
        ));
    }

    #[test]
    fn default_validation_rejects_not_yet_valid_license() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        bean.not_before = Some(context.now_utc() + chrono::Duration::seconds(1));
        assert!(matches!(
            context.validation().validate(&bean),
            Err(KeywrightError::Validation(ValidationError::NotYetValid(_)))
        ));
    }

    #[test]
    fn default_validation_reports_both_subjects_on_mismatch() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        bean.subject = Some("OtherApp".to_string());
        match context.validation().validate(&bean) {
            Err(KeywrightError::Validation(ValidationError::SubjectMismatch {
                expected,
                actual,
            })) => {
                assert_eq!(expected, "App");
                assert_eq!(actual, "OtherApp");
            }
            other => panic!("expected subject mismatch, got {:?}", other),
        }
    }

    #[test]
    fn validation_window_boundaries_are_inclusive() {
        let context = context_at("App", NOW);
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        bean.not_before = Some(context.now_utc());
        bean.not_after = Some(context.now_utc());
        assert!(context.validation().validate(&bean).is_ok());
    }

    struct StampHolder;

    impl LicenseInitialization for StampHolder {
        fn initialize(&self, bean: &mut License) {
            if bean.holder.is_none() {
                bean.holder = Some("CN=Stamped".to_string());
            }
        }
    }

    struct RejectAll;

    impl LicenseValidation for RejectAll {
        fn validate(&self, _bean: &License) -> Result<(), KeywrightError> {
            Err(ValidationError::Custom("rejected".to_string()).into())
        }
    }

    #[test]
    fn decorated_initialization_runs_user_hook_first() {
        let context = builder_at("App", NOW)
            .initialization(Arc::new(StampHolder))
            .build()
            .unwrap();
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        // The user hook claimed the holder; the built-in filled the rest.
        assert_eq!(bean.holder.as_deref(), Some("CN=Stamped"));
        assert_eq!(bean.subject.as_deref(), Some("App"));
    }

    #[test]
    fn overriding_initialization_skips_the_built_in() {
        let context = builder_at("App", NOW)
            .initialization(Arc::new(StampHolder))
            .initialization_composition(FunctionComposition::Override)
            .build()
            .unwrap();
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        assert_eq!(bean.holder.as_deref(), Some("CN=Stamped"));
        assert_eq!(bean.subject, None);
    }

    #[test]
    fn decorated_validation_runs_both() {
        let context = builder_at("App", NOW)
            .validation(Arc::new(RejectAll))
            .build()
            .unwrap();
        let mut bean = License::default();
        context.initialization().initialize(&mut bean);
        assert!(matches!(
            context.validation().validate(&bean),
            Err(KeywrightError::Validation(ValidationError::Custom(_)))
        ));
    }

    #[test]
    fn overriding_validation_replaces_the_built_in() {
        struct AcceptAll;
        impl LicenseValidation for AcceptAll {
            fn validate(&self, _bean: &License) -> Result<(), KeywrightError> {
                Ok(())
            }
        }
        let context = builder_at("App", NOW)
            .validation(Arc::new(AcceptAll))
            .validation_composition(FunctionComposition::Override)
            .build()
            .unwrap();
        // An empty bean would fail the built-in validation.
        assert!(context.validation().validate(&License::default()).is_ok());
    }
}
