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

//! Telnet stream decoder
//!
//! Splits a raw byte stream into complete input lines and control events.
//! The decoder carries no session state beyond the pending partial line and
//! the in-flight IAC sequence, so decoding is invariant under arbitrary
//! fragmentation of the input: feeding N chunks produces exactly the lines
//! and events of feeding their concatenation.

use super::protocol::{
    self, NegotiationVerb, TelnetCommand, TelnetOption, TERMINAL_TYPE_IS,
};

/// Default ceiling on a single input line, in bytes
pub const DEFAULT_MAX_LINE: usize = 1024;

/// Ceiling on buffered subnegotiation payload
const SUBNEG_MAX: usize = 128;

/// Control events extracted from the stream, never part of line text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// Peer negotiation request or answer; option is the raw byte so unknown
    /// options can still be refused
    Negotiate { verb: NegotiationVerb, option: u8 },

    /// NAWS window size report
    WindowSize { width: u16, height: u16 },

    /// TERMINAL-TYPE IS answer
    TerminalType(String),

    /// The pending line crossed the length ceiling; the buffer was cleared
    /// and the rest of the line is being discarded
    LineOverflow,
}

/// Result of one decode call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Complete input lines, in arrival order
    pub lines: Vec<String>,
    /// Control events, in arrival order
    pub events: Vec<TelnetEvent>,
}

impl Decoded {
    /// True when nothing complete was produced
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.events.is_empty()
    }
}

#[derive(Debug)]
enum DecodeState {
    /// Plain text accumulation
    Text,
    /// Saw IAC, awaiting the command byte
    Command,
    /// Saw IAC + negotiation verb, awaiting the option byte
    Negotiating(NegotiationVerb),
    /// Saw IAC SB, awaiting the option byte
    SubnegotiationOption,
    /// Accumulating subnegotiation payload
    Subnegotiation { option: u8, data: Vec<u8> },
    /// Saw IAC inside a subnegotiation, awaiting SE or an escaped IAC
    SubnegotiationCommand { option: u8, data: Vec<u8> },
}

/// Stateful line/command decoder for one connection
pub struct TelnetCodec {
    state: DecodeState,
    line: String,
    overflowed: bool,
    max_line: usize,
}

impl TelnetCodec {
    /// Create a decoder with the given line-length ceiling
    pub fn new(max_line: usize) -> Self {
        Self {
            state: DecodeState::Text,
            line: String::new(),
            overflowed: false,
            max_line,
        }
    }

    /// The pending partial line awaiting its terminator
    pub fn partial(&self) -> &str {
        &self.line
    }

    /// Decode a chunk of raw transport bytes
    pub fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut decoded = Decoded::default();

        for &byte in input {
            self.state = match std::mem::replace(&mut self.state, DecodeState::Text) {
                DecodeState::Text => {
                    if byte == protocol::IAC {
                        DecodeState::Command
                    } else {
                        self.text_byte(byte, &mut decoded);
                        DecodeState::Text
                    }
                }
                DecodeState::Command => {
                    if let Some(verb) = NegotiationVerb::from_byte(byte) {
                        DecodeState::Negotiating(verb)
                    } else if byte == TelnetCommand::SB.to_byte() {
                        DecodeState::SubnegotiationOption
                    } else {
                        // IAC IAC is a literal 0xFF, not printable outside
                        // binary mode; the remaining two-byte commands
                        // (NOP, AYT, GA, ...) are consumed without effect
                        DecodeState::Text
                    }
                }
                DecodeState::Negotiating(verb) => {
                    decoded.events.push(TelnetEvent::Negotiate {
                        verb,
                        option: byte,
                    });
                    DecodeState::Text
                }
                DecodeState::SubnegotiationOption => DecodeState::Subnegotiation {
                    option: byte,
                    data: Vec::new(),
                },
                DecodeState::Subnegotiation { option, mut data } => {
                    if byte == protocol::IAC {
                        DecodeState::SubnegotiationCommand { option, data }
                    } else {
                        if data.len() < SUBNEG_MAX {
                            data.push(byte);
                        }
                        DecodeState::Subnegotiation { option, data }
                    }
                }
                DecodeState::SubnegotiationCommand { option, mut data } => {
                    if byte == TelnetCommand::SE.to_byte() {
                        Self::finish_subnegotiation(option, &data, &mut decoded);
                        DecodeState::Text
                    } else if byte == protocol::IAC {
                        // Escaped literal 0xFF inside the payload
                        if data.len() < SUBNEG_MAX {
                            data.push(protocol::IAC);
                        }
                        DecodeState::Subnegotiation { option, data }
                    } else {
                        // Malformed subnegotiation; drop it and resynchronize
                        DecodeState::Text
                    }
                }
            };
        }

        decoded
    }

    fn text_byte(&mut self, byte: u8, decoded: &mut Decoded) {
        match byte {
            b'\n' => {
                if self.overflowed {
                    self.overflowed = false;
                    self.line.clear();
                } else {
                    decoded.lines.push(std::mem::take(&mut self.line));
                }
            }
            // CR is never a terminator by itself; tolerates both bare-LF
            // and CR-LF clients
            b'\r' => {}
            b'\t' | 0x20..=0x7e => {
                if self.overflowed {
                    return;
                }
                if self.line.len() >= self.max_line {
                    self.overflowed = true;
                    self.line.clear();
                    decoded.events.push(TelnetEvent::LineOverflow);
                    return;
                }
                self.line.push(byte as char);
            }
            // Other control bytes and high-bit bytes are stripped
            _ => {}
        }
    }

    fn finish_subnegotiation(option: u8, data: &[u8], decoded: &mut Decoded) {
        match TelnetOption::from_byte(option) {
            Some(TelnetOption::NAWS) => {
                if let Some((width, height)) = protocol::parse_window_size(data) {
                    decoded
                        .events
                        .push(TelnetEvent::WindowSize { width, height });
                }
            }
            Some(TelnetOption::TerminalType) => {
                if data.first() == Some(&TERMINAL_TYPE_IS) {
                    let name: String = data[1..]
                        .iter()
                        .filter(|b| b.is_ascii_graphic() || **b == b' ')
                        .map(|&b| b as char)
                        .collect();
                    if !name.is_empty() {
                        decoded.events.push(TelnetEvent::TerminalType(name));
                    }
                }
            }
            _ => {}
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}
