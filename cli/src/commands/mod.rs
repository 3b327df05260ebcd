/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
pub mod dump_rom;
pub mod inspect;
pub mod install;
pub mod pack;
pub mod patch;
pub mod probe;
pub mod read_fw;
pub mod reset;
pub mod unpack;
pub mod write_fw;

pub use dump_rom::DumpRomArgs;
pub use inspect::InspectArgs;
pub use install::InstallArgs;
pub use pack::PackArgs;
pub use patch::PatchArgs;
pub use probe::ProbeArgs;
pub use read_fw::ReadFwArgs;
pub use reset::ResetArgs;
pub use unpack::UnpackArgs;
pub use write_fw::WriteFwArgs;

use crate::macros::jms_commands;

jms_commands! {
    Inspect(InspectArgs),
    Unpack(UnpackArgs),
    Pack(PackArgs),
    Patch(PatchArgs),
    Probe(ProbeArgs),
    ReadFw(ReadFwArgs),
    WriteFw(WriteFwArgs),
    Install(InstallArgs),
    DumpRom(DumpRomArgs),
    Reset(ResetArgs),
}
