/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
//! Code-level patching: dispatch-table discovery, hook injection and the
//! boot ROM patch.
//!
//! The JMS578 dispatches vendor SCSI commands through an in-code jump
//! table. Everything here revolves around that: the scanner finds the
//! table, the installer parks extra routines in free code space and splices
//! a trampoline over the vendor command handler, and the descriptor table
//! lets a host discover what got installed.

pub mod jumptable;

mod hooks;
mod payloads;

pub use hooks::{HOOK_VERSION, HookFn, parse_hook_table, patch_bootrom};
pub use jumptable::{JumpTableEntry, find_jump_table};

pub(crate) use hooks::{STANDARD_HOOKS, find_load_address, install, place};
pub(crate) use payloads::{DISABLED_HANDLER, DUMP_ROM, HOOK_RESET};
