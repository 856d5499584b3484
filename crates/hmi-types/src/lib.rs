//! Shared type definitions for the HMI telemetry backend.
//!
//! This crate is the single source of truth for the plant model used
//! across the workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe tag wrappers for tanks and pumps
//! - [`enums`] -- Pump status, alert level, tank category
//! - [`structs`] -- Tank, pump, alert, and the aggregate state snapshot

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AlertLevel, PumpStatus, TankCategory};
pub use ids::{PumpId, TankId};
pub use structs::{Alert, HmiState, Pump, Tank};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::TankId::export_all();
        let _ = crate::ids::PumpId::export_all();

        // Enums
        let _ = crate::enums::PumpStatus::export_all();
        let _ = crate::enums::AlertLevel::export_all();
        let _ = crate::enums::TankCategory::export_all();

        // Structs
        let _ = crate::structs::Tank::export_all();
        let _ = crate::structs::Pump::export_all();
        let _ = crate::structs::Alert::export_all();
        let _ = crate::structs::HmiState::export_all();
    }
}
