//! Tagged requests and their dispatcher
//!
//! Front ends (the CLI, tests) describe what they want as a `Request` and
//! get a `Response` back; rendering is left to the caller.

use crate::error::Result;
use crate::export::{ExportOptions, ExportOutcome};
use crate::harvest::{HarvestStats, harvest_file};
use crate::pipeline::{CollocationIndex, Sources};
use crate::query::{CollocateLookup, CollocateParams, Collocation, GlobalParams};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum Request {
    /// Strongest collocations in the whole corpus
    Global(GlobalParams),
    /// Collocates of one lemma
    Collocates { target: String, params: CollocateParams },
    /// Write the export file for one lemma
    Export { target: String },
    /// Collect more examples for the rows of an export file
    Harvest {
        input: PathBuf,
        output: PathBuf,
        max_examples: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Global(Vec<Collocation>),
    Collocates { target: String, lookup: CollocateLookup },
    Exported { target: String, outcome: ExportOutcome },
    Harvested(HarvestStats),
}

/// Everything a request may need besides the request itself
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub index: &'a CollocationIndex,
    pub sources: &'a Sources,
    pub export_dir: &'a Path,
    pub export: &'a ExportOptions,
}

pub fn dispatch(ctx: &Context<'_>, request: Request) -> Result<Response> {
    let response = match request {
        Request::Global(params) => Response::Global(ctx.index.top_global(&params)),
        Request::Collocates { target, params } => {
            let lookup = ctx.index.collocates(&target, &params);
            Response::Collocates { target, lookup }
        }
        Request::Export { target } => {
            let outcome = ctx.index.export(&target, ctx.export_dir, ctx.export)?;
            Response::Exported { target, outcome }
        }
        Request::Harvest {
            input,
            output,
            max_examples,
        } => Response::Harvested(harvest_file(
            &ctx.sources.lemmas,
            &ctx.sources.surfaces,
            &input,
            &output,
            max_examples,
        )?),
    };
    Ok(response)
}
