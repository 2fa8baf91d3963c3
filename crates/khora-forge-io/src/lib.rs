// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistence and control flow of the forge.
//!
//! This crate owns everything with side effects outside a single compile:
//! the timestamp [`Manifest`], the per-kind [`AssetStore`] blobs, the
//! extension [`Dispatcher`] and the [`Orchestrator`] loop that ties them
//! together over a [`BuildContext`].

#![warn(missing_docs)]

mod config;
mod context;
mod dispatcher;
mod error;
mod manifest;
mod orchestrator;
mod store;

pub use config::*;
pub use context::*;
pub use dispatcher::*;
pub use error::*;
pub use manifest::*;
pub use orchestrator::*;
pub use store::*;
