// SPDX-License-Identifier: AGPL-3.0-or-later

mod config_file;

pub use config_file::ConfigFile;
