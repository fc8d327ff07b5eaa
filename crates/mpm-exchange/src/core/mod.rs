// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Low-level building blocks shared by the datatype packer and the transports.

pub mod ser;
