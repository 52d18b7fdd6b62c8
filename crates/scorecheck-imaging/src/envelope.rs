// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON result envelope for calling processes: images travel as standard
// base64, failures as the error message and its kind.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scorecheck_core::error::ScorecheckError;
use scorecheck_core::{EnvelopeData, ResultEnvelope};

use crate::pipeline::{EncodedImage, PipelineOutput};

/// Base64 text of one encoded image.
pub fn encode_image(image: &EncodedImage) -> String {
    STANDARD.encode(&image.bytes)
}

/// Convert a pipeline result into its envelope.
pub fn to_envelope(result: &Result<PipelineOutput, ScorecheckError>) -> ResultEnvelope {
    match result {
        Ok(PipelineOutput::Single(image)) => {
            ResultEnvelope::ok(EnvelopeData::Image(encode_image(image)))
        }
        Ok(PipelineOutput::Variants(map)) => ResultEnvelope::ok(EnvelopeData::Variants(
            map.iter()
                .map(|(name, image)| (name.clone(), encode_image(image)))
                .collect(),
        )),
        Ok(PipelineOutput::Dimensions(dims)) => {
            ResultEnvelope::ok(EnvelopeData::Dimensions(*dims))
        }
        Err(err) => ResultEnvelope::failure(err),
    }
}
