// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The line codec: command lines out, framed answers in.
//!
//! # Wire format
//!
//! Requests are single newline-terminated ASCII lines:
//!
//! ```text
//! E101 A0 B1 D600
//! ```
//!
//! Answers are zero or more `"<tag>:<value>"` CRLF lines closed by a
//! literal `ok`:
//!
//! ```text
//! V:255.00
//! ok
//! ```
//!
//! # Command catalog
//!
//! | Command | Meaning | Parameters | Answer lines |
//! |---------|---------|------------|--------------|
//! | `E0` | set actuator value | A, V | - |
//! | `E1` | get actuator value | A | V |
//! | `E2` | get sensor value | S | value or NAN |
//! | `E3` | turn automation on/off, or turn all off | R, A, B or none | - |
//! | `E4` | get automation turn state | R, A | B |
//! | `E8` / `E81` | set / get clock | H, M | H, M |
//! | `E9` / `E91` | set / get time source | T | T |
//! | `E101` / `E1011` | hard cycle set / get duration | A, B, D | D |
//! | `E102` | hard cycle current period + elapsed | A | B, D |
//! | `E103` / `E1031` | hard cycle set / get value | A, B, V | V |
//! | `E151` / `E1511` | soft cycle set / get duration | A, P, D | D |
//! | `E152` | soft cycle current period + elapsed | A | B, D |
//! | `E153` / `E1531` | soft cycle set / get value | A, P, V | V |
//! | `E201` / `E2011` | climate set / get sensor | A, S | S |
//! | `E202` / `E2021` | climate set / get minimum | A, V | V |
//! | `E203` / `E2031` | climate set / get maximum | A, V | V |
//! | `E251` / `E2511` | timer set byte / get 12 bytes | A, B, V | 12 × V |
//! | `E252` / `E2521` | timer set / get quarter-hour flag | A, H, \[M\], B | B |

mod answer;
mod line;

pub use answer::Answer;
pub use line::CommandLine;
