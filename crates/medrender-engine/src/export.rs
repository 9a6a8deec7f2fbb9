//! Final artifact production.

use tracing::debug;

use crate::cdp::PrintToPdfParams;
use crate::error::RenderError;
use crate::surface::RenderSurface;

/// What a finished render hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderArtifact {
    /// Printed document bytes.
    Pdf(Vec<u8>),
    /// Serialized markup after pagination and TOC injection (debug mode).
    Markup(String),
}

impl RenderArtifact {
    pub fn size_bytes(&self) -> usize {
        match self {
            RenderArtifact::Pdf(bytes) => bytes.len(),
            RenderArtifact::Markup(text) => text.len(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RenderArtifact::Pdf(_) => "application/pdf",
            RenderArtifact::Markup(_) => "text/html",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RenderArtifact::Pdf(_) => "pdf",
            RenderArtifact::Markup(_) => "html",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RenderArtifact::Pdf(bytes) => bytes,
            RenderArtifact::Markup(text) => text.as_bytes(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RenderArtifact::Pdf(bytes) => bytes,
            RenderArtifact::Markup(text) => text.into_bytes(),
        }
    }
}

/// Prints a surface, or serializes it in debug mode.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    params: PrintToPdfParams,
}

impl Exporter {
    pub fn new(params: PrintToPdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PrintToPdfParams {
        &self.params
    }

    pub async fn export<S>(&self, surface: &S, debug_mode: bool) -> Result<RenderArtifact, RenderError>
    where
        S: RenderSurface + ?Sized,
    {
        if debug_mode {
            let markup = surface.markup().await?;
            debug!("Serialized {} bytes of markup", markup.len());
            return Ok(RenderArtifact::Markup(markup));
        }

        let bytes = surface.print_pdf(&self.params).await?;
        if bytes.is_empty() {
            return Err(RenderError::Export("printer returned an empty document".to_string()));
        }
        debug!("Printed {} bytes", bytes.len());
        Ok(RenderArtifact::Pdf(bytes))
    }
}
