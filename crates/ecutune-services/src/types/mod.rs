// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service layer types: DTOs and errors.
*/

pub mod dtos;
pub mod errors;

pub use dtos::*;
pub use errors::*;
