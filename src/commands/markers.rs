// File: markers.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{bail, Context, Result};

use super::{load_template, print_success, save_template};
use crate::cli::MarkerArgs;
use crate::markers::RequestTemplate;

pub fn execute(args: &MarkerArgs) -> Result<()> {
    let template = load_template(&args.file)?;

    if args.count {
        println!("{}", template.count_marker_pairs());
        return Ok(());
    }

    let edited = apply_edits(template, args)?;

    let destination = if args.in_place {
        Some(args.file.as_path())
    } else {
        args.output.as_deref()
    };

    match destination {
        Some(path) => {
            save_template(path, &edited)?;
            print_success(&format!(
                "Wrote {} ({} marker pair(s))",
                path.display(),
                edited.count_marker_pairs()
            ));
        }
        None => print!("{}", edited.to_text()),
    }

    Ok(())
}

/// Applies the requested edit. Only one of the editing flags may be given.
pub fn apply_edits(template: RequestTemplate, args: &MarkerArgs) -> Result<RequestTemplate> {
    let requested = [
        args.insert.is_some(),
        args.wrap.is_some(),
        args.wrap_text.is_some(),
        args.strip,
    ]
    .iter()
    .filter(|flag| **flag)
    .count();
    if requested > 1 {
        bail!("Use only one of --insert, --wrap, --wrap-text and --strip at a time");
    }

    if let Some(offset) = args.insert {
        return Ok(template.insert_marker_at(offset)?);
    }

    if let Some(range) = args.parse_wrap() {
        let (start, end) = range?;
        return Ok(template.wrap_region(start, end)?);
    }

    if let Some(text) = &args.wrap_text {
        let start = template
            .find(text.as_bytes())
            .with_context(|| format!("'{}' does not occur in the template", text))?;
        return Ok(template.wrap_region(start, start + text.len())?);
    }

    if args.strip {
        return Ok(template.strip_markers());
    }

    Ok(template)
}
