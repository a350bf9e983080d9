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

//! Telnet protocol constants and utilities
//!
//! Byte values here are the legacy wire protocol and must stay bit-exact;
//! decades-old clients depend on receiving these sequences unchanged.

/// Interpret As Command sentinel
pub const IAC: u8 = 255;

/// Telnet command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    /// Don't do option
    DONT = 254,
    /// Do option
    DO = 253,
    /// Won't do option
    WONT = 252,
    /// Will do option
    WILL = 251,
    /// Subnegotiation begin
    SB = 250,
    /// Go ahead
    GA = 249,
    /// Erase line
    EL = 248,
    /// Erase character
    EC = 247,
    /// Are you there
    AYT = 246,
    /// Abort output
    AO = 245,
    /// Interrupt process
    IP = 244,
    /// Break
    BRK = 243,
    /// Data mark
    DM = 242,
    /// No operation
    NOP = 241,
    /// Subnegotiation end
    SE = 240,
}

impl TelnetCommand {
    /// Convert byte to telnet command
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            254 => Some(Self::DONT),
            253 => Some(Self::DO),
            252 => Some(Self::WONT),
            251 => Some(Self::WILL),
            250 => Some(Self::SB),
            249 => Some(Self::GA),
            248 => Some(Self::EL),
            247 => Some(Self::EC),
            246 => Some(Self::AYT),
            245 => Some(Self::AO),
            244 => Some(Self::IP),
            243 => Some(Self::BRK),
            242 => Some(Self::DM),
            241 => Some(Self::NOP),
            240 => Some(Self::SE),
            _ => None,
        }
    }

    /// Convert command to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Option negotiation verbs (the 2nd byte of an `IAC verb option` triplet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NegotiationVerb {
    /// Offer to enable a capability on our side
    Will = 251,
    /// Refuse to enable a capability on our side
    Wont = 252,
    /// Ask the peer to enable a capability
    Do = 253,
    /// Ask the peer to disable a capability
    Dont = 254,
}

impl NegotiationVerb {
    /// Convert byte to negotiation verb
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            251 => Some(Self::Will),
            252 => Some(Self::Wont),
            253 => Some(Self::Do),
            254 => Some(Self::Dont),
            _ => None,
        }
    }

    /// Convert verb to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Telnet option codes this gateway negotiates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetOption {
    /// Binary transmission
    Binary = 0,
    /// Echo
    Echo = 1,
    /// Suppress go ahead
    SuppressGoAhead = 3,
    /// Status
    Status = 5,
    /// Timing mark
    TimingMark = 6,
    /// Terminal type
    TerminalType = 24,
    /// Negotiate about window size (NAWS)
    NAWS = 31,
    /// Linemode
    Linemode = 34,
}

impl TelnetOption {
    /// Convert byte to telnet option
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Binary),
            1 => Some(Self::Echo),
            3 => Some(Self::SuppressGoAhead),
            5 => Some(Self::Status),
            6 => Some(Self::TimingMark),
            24 => Some(Self::TerminalType),
            31 => Some(Self::NAWS),
            34 => Some(Self::Linemode),
            _ => None,
        }
    }

    /// Convert option to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// TERMINAL-TYPE subnegotiation verb: client answers with its name
pub const TERMINAL_TYPE_IS: u8 = 0;
/// TERMINAL-TYPE subnegotiation verb: ask the client for its name
pub const TERMINAL_TYPE_SEND: u8 = 1;

/// Build a telnet negotiation sequence for a raw option byte
pub fn build_negotiation(verb: NegotiationVerb, option: u8) -> Vec<u8> {
    vec![IAC, verb.to_byte(), option]
}

/// Build a telnet subnegotiation sequence
pub fn build_subnegotiation(option: TelnetOption, data: &[u8]) -> Vec<u8> {
    let mut result = vec![IAC, TelnetCommand::SB.to_byte(), option.to_byte()];

    // Escape IAC bytes in data
    for &byte in data {
        result.push(byte);
        if byte == IAC {
            result.push(byte);
        }
    }

    result.push(IAC);
    result.push(TelnetCommand::SE.to_byte());

    result
}

/// Parse window size from NAWS subnegotiation data
pub fn parse_window_size(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() >= 4 {
        let width = u16::from_be_bytes([data[0], data[1]]);
        let height = u16::from_be_bytes([data[2], data[3]]);
        Some((width, height))
    } else {
        None
    }
}

/// Tell the client we will echo, so it suppresses local echo
///
/// Sent immediately before the password prompt.
pub fn suppress_echo() -> Vec<u8> {
    build_negotiation(NegotiationVerb::Will, TelnetOption::Echo.to_byte())
}

/// Tell the client we will no longer echo, restoring local echo
pub fn restore_echo() -> Vec<u8> {
    build_negotiation(NegotiationVerb::Wont, TelnetOption::Echo.to_byte())
}

/// Ask the client to report its terminal type
pub fn request_terminal_type() -> Vec<u8> {
    build_subnegotiation(TelnetOption::TerminalType, &[TERMINAL_TYPE_SEND])
}
