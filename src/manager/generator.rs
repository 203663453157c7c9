//! Lazy license key generator.

use super::Pipeline;
use crate::errors::KeywrightError;
use crate::io::{Sink, Transformation};
use crate::license::License;
use crate::repository::{Decoder, RepositoryModel};
use once_cell::sync::OnceCell;

struct GeneratedKey {
    model: RepositoryModel,
    decoder: Decoder,
}

/// Generates a license key from a bean.
///
/// The effective license is computed exactly once, on first use: the input
/// bean is duplicated through the codec (so later caller mutations cannot
/// leak in), initialized, validated, and signed into a repository model.
/// [`license`](KeyGenerator::license) is idempotent and
/// [`save_to`](KeyGenerator::save_to) is repeatable.
pub struct KeyGenerator {
    pipeline: Pipeline,
    bean: License,
    state: OnceCell<GeneratedKey>,
}

impl KeyGenerator {
    pub(crate) fn new(pipeline: Pipeline, bean: License) -> Self {
        Self {
            pipeline,
            bean,
            state: OnceCell::new(),
        }
    }

    /// The effective license: the input bean after initialization and
    /// validation, decoded back from the signed artifact.
    pub fn license(&self) -> Result<License, KeywrightError> {
        self.generated()?.decoder.license()
    }

    /// Encodes, compresses, and encrypts the signed repository model into
    /// `sink`. May be called any number of times.
    pub fn save_to<S: Sink + ?Sized>(&self, sink: &S) -> Result<&Self, KeywrightError> {
        let generated = self.generated()?;
        let encoded = self
            .pipeline
            .context
            .codec()
            .encode_repository(&generated.model)?;
        sink.write(&self.pipeline.transformation()?.apply(&encoded)?)?;
        Ok(self)
    }

    fn generated(&self) -> Result<&GeneratedKey, KeywrightError> {
        self.state.get_or_try_init(|| {
            let codec = self.pipeline.context.codec().clone();
            // Duplicate through the codec, decoupling from the caller.
            let mut duplicate = codec.decode_license(&codec.encode_license(&self.bean)?)?;
            self.pipeline.initialization().initialize(&mut duplicate);
            self.pipeline.context.validation().validate(&duplicate)?;

            let repository_context = self.pipeline.context.repository_context();
            let mut controller =
                repository_context.controller(repository_context.model(), codec);
            let decoder = self
                .pipeline
                .parameters
                .authentication()
                .sign(&mut controller, &duplicate)?;
            Ok(GeneratedKey {
                model: controller.into_model(),
                decoder,
            })
        })
    }
}
