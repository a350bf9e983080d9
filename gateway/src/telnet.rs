//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Telnet protocol support for the Thornvale gateway
//!
//! This module owns the wire-level pieces of the legacy line protocol:
//! - Protocol constants and negotiation sequences (`protocol`)
//! - The stream decoder splitting bytes into lines and events (`codec`)
//! - Inline `&`-markup rendering to ANSI escapes (`color`)
//!
//! Everything here is free of session state so it can be exercised with
//! literal byte fixtures and reused across every connection.

pub mod codec;
pub mod color;
pub mod protocol;

pub use codec::{Decoded, TelnetCodec, TelnetEvent, DEFAULT_MAX_LINE};
pub use protocol::{NegotiationVerb, TelnetCommand, TelnetOption};
