//! Builtin ASME Section II-D excerpt tables
//!
//! A small library of common pressure-vessel and piping steels so the
//! engine is usable without an operator-supplied table file. Values are
//! excerpted at the tabulated temperature points only; the resolver
//! interpolates linearly between rows and refuses to extrapolate past
//! the last row.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{MaterialPoint, MaterialRef, MaterialTable, Provenance};

fn point(
    temperature: Decimal,
    allowable_stress: Decimal,
    yield_strength: Decimal,
    tensile_strength: Decimal,
    elastic_modulus: Decimal,
) -> MaterialPoint {
    MaterialPoint {
        temperature,
        allowable_stress,
        yield_strength,
        tensile_strength,
        elastic_modulus,
    }
}

fn table_1a(year: i32) -> Provenance {
    Provenance {
        source_document: "ASME BPVC Section II-D (Customary)".to_string(),
        table: "1A".to_string(),
        edition_year: year,
    }
}

/// SA-516 Grade 70 carbon steel plate. Coverage 100–800 °F.
pub fn sa_516_70() -> MaterialTable {
    MaterialTable {
        material: MaterialRef {
            spec: "SA-516".to_string(),
            grade: "70".to_string(),
        },
        provenance: table_1a(2023),
        points: vec![
            point(dec!(100), dec!(20000), dec!(38000), dec!(70000), dec!(29300000)),
            point(dec!(200), dec!(20000), dec!(34800), dec!(70000), dec!(28800000)),
            point(dec!(300), dec!(20000), dec!(33600), dec!(70000), dec!(28300000)),
            point(dec!(400), dec!(20000), dec!(32500), dec!(70000), dec!(27700000)),
            point(dec!(500), dec!(20000), dec!(31000), dec!(70000), dec!(27300000)),
            point(dec!(600), dec!(19400), dec!(29100), dec!(70000), dec!(26700000)),
            point(dec!(650), dec!(18800), dec!(28200), dec!(70000), dec!(26100000)),
            point(dec!(700), dec!(18100), dec!(27200), dec!(70000), dec!(25500000)),
            point(dec!(750), dec!(14800), dec!(26300), dec!(67500), dec!(24850000)),
            point(dec!(800), dec!(12000), dec!(25500), dec!(64000), dec!(24200000)),
        ],
    }
}

/// SA-106 Grade B seamless carbon steel pipe. Coverage 100–800 °F.
pub fn sa_106_b() -> MaterialTable {
    MaterialTable {
        material: MaterialRef {
            spec: "SA-106".to_string(),
            grade: "B".to_string(),
        },
        provenance: table_1a(2023),
        points: vec![
            point(dec!(100), dec!(17100), dec!(35000), dec!(60000), dec!(29300000)),
            point(dec!(300), dec!(17100), dec!(33000), dec!(60000), dec!(28300000)),
            point(dec!(500), dec!(17100), dec!(31000), dec!(60000), dec!(27300000)),
            point(dec!(650), dec!(17100), dec!(29500), dec!(60000), dec!(26100000)),
            point(dec!(700), dec!(16600), dec!(28800), dec!(60000), dec!(25500000)),
            point(dec!(750), dec!(13600), dec!(28100), dec!(58000), dec!(24850000)),
            point(dec!(800), dec!(10800), dec!(27500), dec!(56000), dec!(24200000)),
        ],
    }
}

/// SA-285 Grade C carbon steel plate (storage tanks). Coverage 100–700 °F.
pub fn sa_285_c() -> MaterialTable {
    MaterialTable {
        material: MaterialRef {
            spec: "SA-285".to_string(),
            grade: "C".to_string(),
        },
        provenance: table_1a(2023),
        points: vec![
            point(dec!(100), dec!(15700), dec!(30000), dec!(55000), dec!(29300000)),
            point(dec!(300), dec!(15700), dec!(28300), dec!(55000), dec!(28300000)),
            point(dec!(500), dec!(15700), dec!(26600), dec!(55000), dec!(27300000)),
            point(dec!(600), dec!(15300), dec!(25600), dec!(55000), dec!(26700000)),
            point(dec!(700), dec!(14300), dec!(24600), dec!(55000), dec!(25500000)),
        ],
    }
}

/// SA-240 Type 304 stainless plate (exchanger shells). Coverage 100–1000 °F.
pub fn sa_240_304() -> MaterialTable {
    MaterialTable {
        material: MaterialRef {
            spec: "SA-240".to_string(),
            grade: "304".to_string(),
        },
        provenance: table_1a(2023),
        points: vec![
            point(dec!(100), dec!(20000), dec!(30000), dec!(75000), dec!(28300000)),
            point(dec!(200), dec!(17800), dec!(25000), dec!(71000), dec!(27600000)),
            point(dec!(300), dec!(16600), dec!(22400), dec!(66200), dec!(27000000)),
            point(dec!(400), dec!(15500), dec!(20700), dec!(64000), dec!(26500000)),
            point(dec!(500), dec!(14600), dec!(19400), dec!(63400), dec!(25800000)),
            point(dec!(600), dec!(13800), dec!(18400), dec!(63400), dec!(25300000)),
            point(dec!(700), dec!(13300), dec!(17600), dec!(63400), dec!(24800000)),
            point(dec!(800), dec!(12800), dec!(16900), dec!(62800), dec!(24100000)),
            point(dec!(900), dec!(12300), dec!(16500), dec!(61600), dec!(23500000)),
            point(dec!(1000), dec!(11700), dec!(16200), dec!(60300), dec!(22800000)),
        ],
    }
}

/// All builtin tables.
pub fn builtin_tables() -> Vec<MaterialTable> {
    vec![sa_516_70(), sa_106_b(), sa_285_c(), sa_240_304()]
}
