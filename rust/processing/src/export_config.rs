// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exporter configuration
//!
//! Mirrors the option schema of the authoring tool's IFC exporter so the
//! JSON written here can be imported there unchanged. Choice fields are
//! stored as the exporter's integer codes; [`OptionTable`] maps them to the
//! labels shown to users.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Integer-coded exporter option with its user-facing labels
#[derive(Debug, Clone, Copy)]
pub struct OptionTable {
    pub field: &'static str,
    pub options: &'static [(i32, &'static str)],
}

impl OptionTable {
    pub fn code(&self, label: &str) -> Result<i32> {
        self.options
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(code, _)| *code)
            .ok_or_else(|| Error::UnknownOption {
                field: self.field,
                value: label.to_string(),
            })
    }

    pub fn label(&self, code: i32) -> Result<&'static str> {
        self.options
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
            .ok_or_else(|| Error::UnknownOption {
                field: self.field,
                value: code.to_string(),
            })
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.options.iter().map(|(_, label)| *label).collect()
    }
}

pub const EXCHANGE_REQUIREMENT: OptionTable = OptionTable {
    field: "ExchangeRequirement",
    options: &[(0, "0"), (1, "1"), (2, "2"), (3, "3")],
};

pub const IFC_FILE_TYPE: OptionTable = OptionTable {
    field: "IFCFileType",
    options: &[
        (0, "IFC"),
        (1, "IFC XML"),
        (2, "IFC Compressed"),
        (3, "IFC XML Compressed"),
    ],
};

pub const PHASE: OptionTable = OptionTable {
    field: "ActivePhaseId",
    options: &[(-1, "Default"), (0, "Existing"), (1, "New Construction")],
};

pub const SPACE_BOUNDARIES: OptionTable = OptionTable {
    field: "SpaceBoundaries",
    options: &[(0, "None"), (1, "First Level"), (2, "Second Level")],
};

pub const FACILITY_TYPE: OptionTable = OptionTable {
    field: "FacilityType",
    options: &[
        (0, "IfcBridge"),
        (1, "IfcBuilding"),
        (2, "IfcMarineFacility"),
        (3, "IfcRailway"),
        (4, "IfcRoad"),
    ],
};

pub const LINKED_FILES: OptionTable = OptionTable {
    field: "ExportLinkedFiles",
    options: &[
        (0, "Do Not Export"),
        (1, "Export as Separate IFC"),
        (2, "Export in Same IfcProject"),
        (3, "Export in Same IfcSite"),
    ],
};

pub const SITE_PLACEMENT: OptionTable = OptionTable {
    field: "SitePlacement",
    options: &[
        (0, "Shared Coordinates"),
        (1, "Survey Point"),
        (2, "Project Base Point"),
        (3, "Internal Origin"),
        (4, "Project Base Point Oriented to True North"),
        (5, "Internal Origin Oriented to True North"),
    ],
};

/// Tessellation presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelOfDetail {
    #[serde(rename = "Very Coarse")]
    VeryCoarse,
    Coarse,
    Medium,
    Fine,
}

impl LevelOfDetail {
    pub const ALL: [LevelOfDetail; 4] = [
        LevelOfDetail::VeryCoarse,
        LevelOfDetail::Coarse,
        LevelOfDetail::Medium,
        LevelOfDetail::Fine,
    ];

    pub fn value(self) -> f64 {
        match self {
            LevelOfDetail::VeryCoarse => 0.25,
            LevelOfDetail::Coarse => 0.5,
            LevelOfDetail::Medium => 0.75,
            LevelOfDetail::Fine => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LevelOfDetail::VeryCoarse => "Very Coarse",
            LevelOfDetail::Coarse => "Coarse",
            LevelOfDetail::Medium => "Medium",
            LevelOfDetail::Fine => "Fine",
        }
    }

    pub fn from_label(label: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|lod| lod.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| Error::UnknownOption {
                field: "TessellationLevelOfDetail",
                value: label.to_string(),
            })
    }

    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|lod| lod.value() == value)
    }
}

/// Entities offered in the export selector, in exporter order
pub const ENTITY_CATALOG: &[&str] = &[
    "IfcProduct", "IfcElement", "IfcBuiltElement", "IfcBeam", "IfcBearing", "IfcBuildingElementProxy",
    "IfcChimney", "IfcColumn", "IfcCourse", "IfcCovering", "IfcCurtainWall", "IfcDeepFoundation",
    "IfcCaissonFoundation", "IfcPile", "IfcDoor", "IfcEarthworksElement", "IfcEarthworksFill",
    "IfcReinforcedSoil", "IfcFooting", "IfcKerb", "IfcMember", "IfcMooringDevice", "IfcNavigationElement",
    "IfcPavement", "IfcPlate", "IfcRail", "IfcRailing", "IfcRamp", "IfcRampFlight", "IfcRoof", "IfcShadingDevice",
    "IfcSlab", "IfcStair", "IfcStairFlight", "IfcTrackElement", "IfcWall", "IfcWindow", "IfcCivilElement",
    "IfcDistributionElement", "IfcDistributionControlElement", "IfcActuator", "IfcAlarm", "IfcController",
    "IfcFlowInstrument", "IfcProtectiveDeviceTrippingUnit", "IfcSensor", "IfcUnitaryControlElement",
    "IfcDistributionFlowElement", "IfcDistributionChamberElement", "IfcEnergyConversionDevice",
    "IfcAirToAirHeatRecovery", "IfcBoiler", "IfcBurner", "IfcChiller", "IfcCoil", "IfcCondenser", "IfcCooledBeam",
    "IfcCoolingTower", "IfcElectricGenerator", "IfcElectricMotor", "IfcEngine", "IfcEvaporativeCooler",
    "IfcEvaporator", "IfcHeatExchanger", "IfcHumidifier", "IfcMotorConnection", "IfcSolarDevice", "IfcTransformer",
    "IfcTubeBundle", "IfcUnitaryEquipment", "IfcFlowController", "IfcAirTerminalBox", "IfcDamper",
    "IfcDistributionBoard", "IfcElectricDistributionBoard", "IfcElectricTimeControl", "IfcFlowMeter",
    "IfcProtectiveDevice", "IfcSwitchingDevice", "IfcValve", "IfcFlowFitting", "IfcCableCarrierFitting",
    "IfcCableFitting", "IfcDuctFitting", "IfcJunctionBox", "IfcPipeFitting", "IfcFlowMovingDevice",
    "IfcCompressor", "IfcFan", "IfcPump", "IfcFlowSegment", "IfcCableCarrierSegment", "IfcCableSegment",
    "IfcConveyorSegment", "IfcDuctSegment", "IfcPipeSegment", "IfcFlowStorageDevice", "IfcElectricFlowStorageDevice",
    "IfcTank", "IfcFlowTerminal", "IfcAirTerminal", "IfcAudioVisualAppliance", "IfcCommunicationsAppliance",
    "IfcElectricAppliance", "IfcFireSuppressionTerminal", "IfcLamp", "IfcLightFixture", "IfcLiquidTerminal",
    "IfcMedicalDevice", "IfcMobileTelecommunicationsAppliance", "IfcOutlet", "IfcSanitaryTerminal", "IfcSignal",
    "IfcSpaceHeater", "IfcStackTerminal", "IfcWasteTerminal", "IfcFlowTreatmentDevice", "IfcDuctSilencer",
    "IfcElectricFlowTreatmentDevice", "IfcFilter", "IfcInterceptor", "IfcElementAssembly", "IfcElementComponent",
    "IfcBuildingElementPart", "IfcDiscreteAccessory", "IfcFastener", "IfcImpactProtectionDevice",
    "IfcMechanicalFastener", "IfcReinforcingElement", "IfcReinforcingBar", "IfcReinforcingMesh", "IfcTendonAnchor",
    "IfcTendonConduit", "IfcTendon", "IfcSign", "IfcVibrationDamper", "IfcVibrationIsolator", "IfcFurnishingElement",
    "IfcFurniture", "IfcSystemFurnitureElement", "IfcGeographicElement", "IfcTransportationDevice", "IfcTransportElement",
    "IfcVehicle", "IfcSpatialElement", "IfcSpatialStructureElement", "IfcSpace", "IfcSpatialZone", "IfcGroup", "IfcAsset",
    "IfcInventory", "IfcStructuralLoadGroup", "IfcStructuralLoadCase", "IfcStructuralResultGroup", "IfcSystem",
    "IfcBuildingSystem", "IfcBuiltSystem", "IfcDistributionSystem", "IfcDistributionCircuit", "IfcStructuralAnalysisModel",
    "IfcZone",
];

/// `;`-joined catalog entries that were not selected
///
/// Nothing selected means export everything, i.e. an empty filter.
pub fn exclude_filter<S: AsRef<str>>(selected: &[S]) -> Result<String> {
    if selected.is_empty() {
        return Ok(String::new());
    }
    if let Some(unknown) = selected
        .iter()
        .find(|s| !ENTITY_CATALOG.contains(&s.as_ref()))
    {
        return Err(Error::UnknownOption {
            field: "ExcludeFilter",
            value: unknown.as_ref().to_string(),
        });
    }
    Ok(ENTITY_CATALOG
        .iter()
        .filter(|entity| !selected.iter().any(|s| s.as_ref() == **entity))
        .copied()
        .collect::<Vec<_>>()
        .join(";"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectAddress {
    pub update_project_information: bool,
    pub assign_address_to_site: bool,
    pub assign_address_to_building: bool,
}

impl Default for ProjectAddress {
    fn default() -> Self {
        Self {
            update_project_information: false,
            assign_address_to_site: false,
            assign_address_to_building: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassificationSettings {
    pub classification_name: Option<String>,
    pub classification_edition: Option<String>,
    pub classification_source: Option<String>,
    pub classification_edition_date: String,
    pub classification_location: Option<String>,
    pub classification_field_name: Option<String>,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            classification_name: None,
            classification_edition: None,
            classification_source: None,
            classification_edition_date: "/Date(-62135596800000)/".to_string(),
            classification_location: None,
            classification_field_name: None,
        }
    }
}

/// General exporter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportSettings {
    #[serde(rename = "IFCVersion")]
    pub ifc_version: i32,
    pub exchange_requirement: i32,
    pub facility_type: i32,
    pub facility_predefined_type: Option<String>,
    pub category_mapping: Option<String>,
    #[serde(rename = "IFCFileType")]
    pub ifc_file_type: i32,
    pub active_phase_id: i32,
    pub space_boundaries: i32,
    pub split_walls_and_columns: bool,
    pub include_steel_elements: bool,
    pub project_address: ProjectAddress,
    #[serde(rename = "Export2DElements")]
    pub export_2d_elements: bool,
    pub export_linked_files: i32,
    pub visible_elements_of_current_view: bool,
    pub export_rooms_in_view: bool,
    pub export_internal_revit_property_sets: bool,
    #[serde(rename = "ExportIFCCommonPropertySets")]
    pub export_ifc_common_property_sets: bool,
    pub export_base_quantities: bool,
    pub export_ceiling_grids: bool,
    pub export_material_psets: bool,
    pub export_schedules_as_psets: bool,
    pub export_specific_schedules: bool,
    pub export_user_defined_psets: bool,
    pub export_user_defined_psets_file_name: String,
    // key spelled as the exporter spells it
    #[serde(rename = "UseTypePropertiesInInstacePSets")]
    pub use_type_properties_in_instance_psets: bool,
    pub export_user_defined_parameter_mapping: bool,
    pub export_user_defined_parameter_mapping_file_name: String,
    pub classification_settings: ClassificationSettings,
    pub tessellation_level_of_detail: f64,
    pub export_parts_as_building_elements: bool,
    pub export_solid_model_rep: bool,
    pub use_active_view_geometry: bool,
    pub use_family_and_type_name_for_reference: bool,
    #[serde(rename = "Use2DRoomBoundaryForVolume")]
    pub use_2d_room_boundary_for_volume: bool,
    pub include_site_elevation: bool,
    #[serde(rename = "StoreIFCGUID")]
    pub store_ifc_guid: bool,
    pub export_bounding_box: bool,
    pub use_only_triangulation: bool,
    pub use_type_name_only_for_ifc_type: bool,
    pub export_host_as_single_entity: bool,
    pub owner_history_last_modified: bool,
    #[serde(rename = "ExportBarsInUniformSetsAsSeparateIFCEntities")]
    pub export_bars_in_uniform_sets_as_separate_ifc_entities: bool,
    pub use_visible_revit_name_as_entity_name: bool,
    pub selected_site: String,
    pub site_placement: i32,
    #[serde(rename = "GeoRefCRSName")]
    pub geo_ref_crs_name: String,
    #[serde(rename = "GeoRefCRSDesc")]
    pub geo_ref_crs_desc: String,
    #[serde(rename = "GeoRefEPSGCode")]
    pub geo_ref_epsg_code: String,
    pub geo_ref_geodetic_datum: String,
    pub geo_ref_map_unit: String,
    pub exclude_filter: String,
    #[serde(rename = "COBieCompanyInfo")]
    pub cobie_company_info: String,
    #[serde(rename = "COBieProjectInfo")]
    pub cobie_project_info: String,
    pub name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            ifc_version: 29,
            exchange_requirement: 3,
            facility_type: 0,
            facility_predefined_type: None,
            category_mapping: None,
            ifc_file_type: 0,
            active_phase_id: -1,
            space_boundaries: 0,
            split_walls_and_columns: true,
            include_steel_elements: true,
            project_address: ProjectAddress::default(),
            export_2d_elements: false,
            export_linked_files: 0,
            visible_elements_of_current_view: false,
            export_rooms_in_view: false,
            export_internal_revit_property_sets: true,
            export_ifc_common_property_sets: true,
            export_base_quantities: true,
            export_ceiling_grids: false,
            export_material_psets: true,
            export_schedules_as_psets: true,
            export_specific_schedules: true,
            export_user_defined_psets: true,
            export_user_defined_psets_file_name: String::new(),
            use_type_properties_in_instance_psets: false,
            export_user_defined_parameter_mapping: false,
            export_user_defined_parameter_mapping_file_name: String::new(),
            classification_settings: ClassificationSettings::default(),
            tessellation_level_of_detail: LevelOfDetail::Fine.value(),
            export_parts_as_building_elements: false,
            export_solid_model_rep: false,
            use_active_view_geometry: false,
            use_family_and_type_name_for_reference: false,
            use_2d_room_boundary_for_volume: false,
            include_site_elevation: false,
            store_ifc_guid: true,
            export_bounding_box: false,
            use_only_triangulation: false,
            use_type_name_only_for_ifc_type: false,
            export_host_as_single_entity: false,
            owner_history_last_modified: false,
            export_bars_in_uniform_sets_as_separate_ifc_entities: true,
            use_visible_revit_name_as_entity_name: true,
            selected_site: "Default Site".to_string(),
            site_placement: 0,
            geo_ref_crs_name: String::new(),
            geo_ref_crs_desc: String::new(),
            geo_ref_epsg_code: String::new(),
            geo_ref_geodetic_datum: String::new(),
            geo_ref_map_unit: String::new(),
            exclude_filter: String::new(),
            cobie_company_info: String::new(),
            cobie_project_info: String::new(),
            name: "Configurazione IFC - IFC4x3_Prova".to_string(),
        }
    }
}

impl ExportSettings {
    fn coded_fields(&self) -> [(OptionTable, i32); 7] {
        [
            (EXCHANGE_REQUIREMENT, self.exchange_requirement),
            (IFC_FILE_TYPE, self.ifc_file_type),
            (PHASE, self.active_phase_id),
            (SPACE_BOUNDARIES, self.space_boundaries),
            (FACILITY_TYPE, self.facility_type),
            (LINKED_FILES, self.export_linked_files),
            (SITE_PLACEMENT, self.site_placement),
        ]
    }

    /// Reject codes and presets the exporter does not know
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid("configuration name is required"));
        }
        for (table, code) in self.coded_fields() {
            table.label(code)?;
        }
        if LevelOfDetail::from_value(self.tessellation_level_of_detail).is_none() {
            return Err(Error::UnknownOption {
                field: "TessellationLevelOfDetail",
                value: self.tessellation_level_of_detail.to_string(),
            });
        }
        Ok(())
    }

    /// Set a choice field from its label
    pub fn set_option(&mut self, field: &str, label: &str) -> Result<()> {
        let (table, slot) = match field {
            "ExchangeRequirement" => (EXCHANGE_REQUIREMENT, &mut self.exchange_requirement),
            "IFCFileType" => (IFC_FILE_TYPE, &mut self.ifc_file_type),
            "ActivePhaseId" => (PHASE, &mut self.active_phase_id),
            "SpaceBoundaries" => (SPACE_BOUNDARIES, &mut self.space_boundaries),
            "FacilityType" => (FACILITY_TYPE, &mut self.facility_type),
            "ExportLinkedFiles" => (LINKED_FILES, &mut self.export_linked_files),
            "SitePlacement" => (SITE_PLACEMENT, &mut self.site_placement),
            "TessellationLevelOfDetail" => {
                self.tessellation_level_of_detail = LevelOfDetail::from_label(label)?.value();
                return Ok(());
            }
            _ => return Err(Error::invalid(format!("'{}' is not a choice field", field))),
        };
        *slot = table.code(label)?;
        Ok(())
    }

    /// Label of every choice field, keyed by exporter field name
    pub fn option_labels(&self) -> Vec<(&'static str, &'static str)> {
        let mut labels: Vec<(&'static str, &'static str)> = self
            .coded_fields()
            .iter()
            .filter_map(|(table, code)| table.label(*code).ok().map(|label| (table.field, label)))
            .collect();
        if let Some(lod) = LevelOfDetail::from_value(self.tessellation_level_of_detail) {
            labels.push(("TessellationLevelOfDetail", lod.label()));
        }
        labels
    }

    /// Restrict the export to the selected entities
    pub fn select_entities<S: AsRef<str>>(&mut self, selected: &[S]) -> Result<()> {
        self.exclude_filter = exclude_filter(selected)?;
        Ok(())
    }
}

/// Property export rule as written by the sidebar rule creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRule {
    pub ifc_class: String,
    pub property_set: String,
    #[serde(default)]
    pub property_name: Vec<String>,
    #[serde(default)]
    pub include_all_properties: bool,
    #[serde(default = "mandatory_default")]
    pub mandatory: bool,
}

fn mandatory_default() -> bool {
    true
}

impl ExportRule {
    pub fn validate(&self) -> Result<()> {
        if self.ifc_class.trim().is_empty() || self.property_set.trim().is_empty() {
            return Err(Error::invalid("IFC class and property set are required"));
        }
        if !self.include_all_properties && self.property_name.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::invalid("select at least one property or include all properties"));
        }
        Ok(())
    }
}

/// Settings plus rules, as one exporter JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfiguration {
    #[serde(flatten)]
    pub settings: ExportSettings,
    #[serde(rename = "ExportRules", default)]
    pub rules: Vec<ExportRule>,
}

impl ExportConfiguration {
    pub fn add_rule(&mut self, rule: ExportRule) -> Result<()> {
        rule.validate()?;
        self.rules.push(rule);
        Ok(())
    }

    pub fn remove_rule(&mut self, index: usize) -> Result<ExportRule> {
        if index >= self.rules.len() {
            return Err(Error::RuleIndex {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Four-space indented JSON, as the exporter writes it
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| Error::invalid(e.to_string()))
    }

    /// Parse and check a configuration document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: ExportConfiguration = serde_json::from_str(content)?;
        config.settings.validate()?;
        for rule in &config.rules {
            rule.validate()?;
        }
        Ok(config)
    }

    pub fn file_name(&self) -> String {
        format!("export_config_{}.json", self.settings.name.replace(' ', "_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_default_keys() {
        let json = serde_json::to_value(ExportSettings::default()).unwrap();
        assert_eq!(json["IFCVersion"], 29);
        assert_eq!(json["ActivePhaseId"], -1);
        assert_eq!(json["UseTypePropertiesInInstacePSets"], false);
        assert_eq!(json["Export2DElements"], false);
        assert_eq!(json["ProjectAddress"]["AssignAddressToBuilding"], true);
        assert_eq!(json["ClassificationSettings"]["ClassificationName"], Value::Null);
        assert_eq!(json["GeoRefEPSGCode"], "");
        assert_eq!(json["TessellationLevelOfDetail"], 1.0);
        assert!(ExportSettings::default().validate().is_ok());
    }

    #[test]
    fn test_options() {
        let mut settings = ExportSettings::default();
        settings.set_option("IFCFileType", "IFC XML Compressed").unwrap();
        settings.set_option("SitePlacement", "Survey Point").unwrap();
        settings.set_option("TessellationLevelOfDetail", "Very Coarse").unwrap();
        assert_eq!(settings.ifc_file_type, 3);
        assert_eq!(settings.site_placement, 1);
        assert_eq!(settings.tessellation_level_of_detail, 0.25);

        let err = settings.set_option("SpaceBoundaries", "Third Level").unwrap_err();
        assert!(matches!(err, Error::UnknownOption { field: "SpaceBoundaries", .. }));
        assert_eq!(settings.space_boundaries, 0);

        let labels = settings.option_labels();
        assert!(labels.contains(&("SitePlacement", "Survey Point")));
        assert!(labels.contains(&("TessellationLevelOfDetail", "Very Coarse")));

        settings.site_placement = 9;
        assert!(settings.validate().is_err());
        assert_eq!(SITE_PLACEMENT.labels().len(), 6);
    }

    #[test]
    fn test_exclude_filter() {
        assert_eq!(exclude_filter::<&str>(&[]).unwrap(), "");
        let filter = exclude_filter(&["IfcProduct", "IfcBeam"]).unwrap();
        assert!(filter.starts_with("IfcElement;IfcBuiltElement;IfcBearing;"));
        assert!(!filter.contains("IfcBeam;"));
        assert!(filter.ends_with(";IfcZone"));
        assert_eq!(filter.split(';').count(), ENTITY_CATALOG.len() - 2);
        assert!(exclude_filter(&["IfcBeam", "IfcUnicorn"]).is_err());
    }

    #[test]
    fn test_configuration_json() {
        let mut config = ExportConfiguration::default();
        config.settings.name = "Deck export".to_string();
        config
            .add_rule(ExportRule {
                ifc_class: "IfcBeam".to_string(),
                property_set: "Pset_BeamCommon".to_string(),
                property_name: vec!["Span".to_string()],
                include_all_properties: false,
                mandatory: true,
            })
            .unwrap();
        assert!(config
            .add_rule(ExportRule {
                ifc_class: "IfcBeam".to_string(),
                property_set: "Pset_BeamCommon".to_string(),
                property_name: vec![],
                include_all_properties: false,
                mandatory: true,
            })
            .is_err());
        assert_eq!(config.file_name(), "export_config_Deck_export.json");

        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\n    \"IFCVersion\": 29,"));
        assert!(json.contains("\"ExportRules\": ["));

        let back = ExportConfiguration::from_json(&json).unwrap();
        assert_eq!(back, config);

        let rules = crate::ids::parse_rules_json(&json).unwrap();
        assert_eq!(rules[0].ifc_class, "IfcBeam");
        assert_eq!(rules[0].properties[0].property_name, "Span");

        assert!(config.remove_rule(4).is_err());
        config.remove_rule(0).unwrap();
        assert!(config.rules.is_empty());
    }
}
