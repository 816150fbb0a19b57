//! `armor.tbl`

use fsotbl_parse::Node;
use fsotbl_parse::schema::build::*;

/// Armor types and their per-damage-type modifiers.
pub fn armor_table() -> Vec<Node> {
    vec![
        section(
            "#Armor Type",
            [
                string("$Name")
                    .required()
                    .doc("Name of the armor type, referenced from ships.tbl"),
                section(
                    "$Damage Type",
                    [
                        string("").required(),
                        string("+Calculation").doc("How the damage is modified, e.g. Multiplicative"),
                        float("+Value").doc("Argument of the calculation"),
                    ],
                )
                .multi()
                .doc("Damage modifier for one damage type"),
            ],
        )
        .required(),
    ]
}
