// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action, log_warning};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_NAME: &str = "Administrator";
const ADMIN_ID: u64 = 1;

pub fn ensure_users(root: &Path) -> Result<bool, BootstrapError> {
    let users_path = root.join("users.yaml");
    if users_path.exists() {
        return Ok(false);
    }

    let yaml = format!(
        "\"{email}\":\n  id: {id}\n  name: \"{name}\"\n  roles:\n    - \"{role}\"\n",
        email = ADMIN_EMAIL,
        id = ADMIN_ID,
        name = ADMIN_NAME,
        role = crate::iam::ADMIN_ROLE,
    );

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&users_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(yaml.as_bytes())?;
    file.sync_all()?;

    log_action(format!("created users.yaml with {}", ADMIN_EMAIL));
    log_warning(format!(
        "rename {} in users.yaml, then run `usertags token <email>` for a session token",
        ADMIN_EMAIL
    ));

    Ok(true)
}
