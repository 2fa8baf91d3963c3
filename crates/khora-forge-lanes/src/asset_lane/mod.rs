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

//! Compiler lanes, one per asset kind.
//!
//! Every lane implements [`AssetCompilerLane`], so the dispatcher can drive
//! them generically. Lanes never touch a store; they only produce records.

mod compiler;
mod error;

pub mod audio;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use compiler::*;
pub use error::*;
