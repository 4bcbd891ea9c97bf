//! Static device allow-lists.
//!
//! Device policies only claim data sets from the manufacturers and models
//! listed here. Manufacturer and model names are matched exactly.

use crate::models::DataSet;

/// Manufacturer to models whose uploads use platform identity hashes.
pub const PLATFORM_HASH_DEVICES: &[(&str, &[&str])] = &[
    ("Abbott", &["FreeStyle Libre"]),
    (
        "LifeScan",
        &["OneTouch Ultra 2", "OneTouch UltraMini", "Verio", "Verio Flex"],
    ),
    (
        "Medtronic",
        &[
            "523", "523K", "551", "554", "723", "723K", "751", "754", "1510", "1510K", "1511",
            "1512", "1580", "1581", "1582", "1710", "1710K", "1711", "1712", "1714", "1714K",
            "1715", "1780", "1781", "1782",
        ],
    ),
    (
        "Trividia Health",
        &["TRUE METRIX", "TRUE METRIX AIR", "TRUE METRIX GO"],
    ),
];

/// Manufacturer to models whose uploads use legacy identity hashes.
pub const LEGACY_HASH_DEVICES: &[(&str, &[&str])] = &[
    ("Arkray", &["GlucoCardExpression"]),
    (
        "Bayer",
        &[
            "Contour Next Link",
            "Contour Next Link 2.4",
            "Contour Next",
            "Contour USB",
            "Contour Next USB",
            "Contour Next One",
            "Contour",
            "Contour Next EZ",
            "Contour Plus",
            "Contour Plus Blue",
        ],
    ),
    (
        "Dexcom",
        &["G5 touchscreen receiver", "G6 touchscreen receiver"],
    ),
    ("GlucoRx", &["Nexus", "HCT", "Nexus Mini Ultra", "Go"]),
    ("i-SENS", &["CareSens"]),
    ("MicroTech", &["Equil"]),
    (
        "Roche",
        &[
            "Aviva Connect",
            "Performa Connect",
            "Guide Link",
            "Instant (single-button)",
            "Guide",
            "Instant (two-button)",
            "Instant S (single-button)",
            "ReliOn Platinum",
        ],
    ),
    ("Sinocare", &["Safe AQ smart (RBG)", "Safe AQ smart (UG)"]),
];

/// Manufacturers whose uploads replace all prior history of the device.
pub const TRUNCATE_MANUFACTURERS: &[&str] = &["Animas", "Insulet", "Medtronic", "Tandem"];

/// True for normal data sets that declare a device id.
#[must_use]
pub fn is_device_upload(data_set: &DataSet) -> bool {
    data_set.has_data_set_type_normal()
        && data_set
            .device_id
            .as_deref()
            .is_some_and(|device_id| !device_id.is_empty())
}

/// True if any declared manufacturer lists the declared model.
#[must_use]
pub fn supports_model(
    devices: &[(&str, &[&str])],
    manufacturers: &[String],
    model: Option<&str>,
) -> bool {
    let Some(model) = model else {
        return false;
    };
    manufacturers.iter().any(|manufacturer| {
        devices
            .iter()
            .any(|(name, models)| *name == manufacturer.as_str() && models.contains(&model))
    })
}

/// True if any declared manufacturer is allowed.
#[must_use]
pub fn supports_manufacturer(allowed: &[&str], manufacturers: &[String]) -> bool {
    manufacturers
        .iter()
        .any(|manufacturer| allowed.contains(&manufacturer.as_str()))
}
