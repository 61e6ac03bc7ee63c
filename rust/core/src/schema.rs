// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC class table
//!
//! Inheritance and attribute names for the IFC2X3/IFC4/IFC4X3 classes the
//! application reasons about. Lookups are case-insensitive; the file stores
//! upper case names, reports use PascalCase.

use std::borrow::Cow;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

/// (class, supertype)
const CLASSES: &[(&str, Option<&str>)] = &[
    // Kernel
    ("IfcRoot", None),
    ("IfcObjectDefinition", Some("IfcRoot")),
    ("IfcObject", Some("IfcObjectDefinition")),
    ("IfcContext", Some("IfcObjectDefinition")),
    ("IfcProject", Some("IfcContext")),
    ("IfcProjectLibrary", Some("IfcContext")),
    ("IfcTypeObject", Some("IfcObjectDefinition")),
    ("IfcTypeProcess", Some("IfcTypeObject")),
    ("IfcTaskType", Some("IfcTypeProcess")),
    ("IfcTypeResource", Some("IfcTypeObject")),
    ("IfcTypeProduct", Some("IfcTypeObject")),
    ("IfcElementType", Some("IfcTypeProduct")),
    ("IfcSpatialElementType", Some("IfcTypeProduct")),
    ("IfcSpaceType", Some("IfcSpatialElementType")),
    ("IfcBuiltElementType", Some("IfcElementType")),
    ("IfcBuildingElementType", Some("IfcElementType")),
    ("IfcBeamType", Some("IfcBuiltElementType")),
    ("IfcBearingType", Some("IfcBuiltElementType")),
    ("IfcBuildingElementProxyType", Some("IfcBuiltElementType")),
    ("IfcChimneyType", Some("IfcBuiltElementType")),
    ("IfcColumnType", Some("IfcBuiltElementType")),
    ("IfcCoveringType", Some("IfcBuiltElementType")),
    ("IfcCurtainWallType", Some("IfcBuiltElementType")),
    ("IfcDoorType", Some("IfcBuiltElementType")),
    ("IfcFootingType", Some("IfcBuiltElementType")),
    ("IfcMemberType", Some("IfcBuiltElementType")),
    ("IfcPileType", Some("IfcBuiltElementType")),
    ("IfcPlateType", Some("IfcBuiltElementType")),
    ("IfcRailingType", Some("IfcBuiltElementType")),
    ("IfcRampFlightType", Some("IfcBuiltElementType")),
    ("IfcRampType", Some("IfcBuiltElementType")),
    ("IfcRoofType", Some("IfcBuiltElementType")),
    ("IfcShadingDeviceType", Some("IfcBuiltElementType")),
    ("IfcSlabType", Some("IfcBuiltElementType")),
    ("IfcStairFlightType", Some("IfcBuiltElementType")),
    ("IfcStairType", Some("IfcBuiltElementType")),
    ("IfcWallType", Some("IfcBuiltElementType")),
    ("IfcWindowType", Some("IfcBuiltElementType")),
    ("IfcElementComponentType", Some("IfcElementType")),
    ("IfcReinforcingElementType", Some("IfcElementComponentType")),
    ("IfcReinforcingBarType", Some("IfcReinforcingElementType")),
    ("IfcReinforcingMeshType", Some("IfcReinforcingElementType")),
    ("IfcTendonType", Some("IfcReinforcingElementType")),
    ("IfcTendonAnchorType", Some("IfcReinforcingElementType")),
    ("IfcFurnishingElementType", Some("IfcElementType")),
    ("IfcFurnitureType", Some("IfcFurnishingElementType")),
    ("IfcDistributionElementType", Some("IfcElementType")),
    ("IfcDistributionFlowElementType", Some("IfcDistributionElementType")),
    ("IfcFlowSegmentType", Some("IfcDistributionFlowElementType")),
    ("IfcPipeSegmentType", Some("IfcFlowSegmentType")),
    ("IfcDuctSegmentType", Some("IfcFlowSegmentType")),
    ("IfcCableSegmentType", Some("IfcFlowSegmentType")),
    ("IfcFlowTerminalType", Some("IfcDistributionFlowElementType")),
    ("IfcFlowFittingType", Some("IfcDistributionFlowElementType")),
    // Controls, processes, resources, groups
    ("IfcControl", Some("IfcObject")),
    ("IfcWorkControl", Some("IfcControl")),
    ("IfcWorkPlan", Some("IfcWorkControl")),
    ("IfcWorkSchedule", Some("IfcWorkControl")),
    ("IfcWorkCalendar", Some("IfcControl")),
    ("IfcCostSchedule", Some("IfcControl")),
    ("IfcCostItem", Some("IfcControl")),
    ("IfcPerformanceHistory", Some("IfcControl")),
    ("IfcProcess", Some("IfcObject")),
    ("IfcTask", Some("IfcProcess")),
    ("IfcEvent", Some("IfcProcess")),
    ("IfcProcedure", Some("IfcProcess")),
    ("IfcResource", Some("IfcObject")),
    ("IfcConstructionResource", Some("IfcResource")),
    ("IfcLaborResource", Some("IfcConstructionResource")),
    ("IfcCrewResource", Some("IfcConstructionResource")),
    ("IfcConstructionMaterialResource", Some("IfcConstructionResource")),
    ("IfcConstructionEquipmentResource", Some("IfcConstructionResource")),
    ("IfcActor", Some("IfcObject")),
    ("IfcGroup", Some("IfcObject")),
    ("IfcSystem", Some("IfcGroup")),
    ("IfcZone", Some("IfcSystem")),
    ("IfcBuildingSystem", Some("IfcSystem")),
    ("IfcDistributionSystem", Some("IfcSystem")),
    // Products
    ("IfcProduct", Some("IfcObject")),
    ("IfcAnnotation", Some("IfcProduct")),
    ("IfcPort", Some("IfcProduct")),
    ("IfcDistributionPort", Some("IfcPort")),
    ("IfcPositioningElement", Some("IfcProduct")),
    ("IfcGrid", Some("IfcPositioningElement")),
    ("IfcLinearPositioningElement", Some("IfcPositioningElement")),
    ("IfcAlignment", Some("IfcLinearPositioningElement")),
    ("IfcReferent", Some("IfcPositioningElement")),
    ("IfcStructuralItem", Some("IfcProduct")),
    ("IfcStructuralMember", Some("IfcStructuralItem")),
    ("IfcStructuralCurveMember", Some("IfcStructuralMember")),
    ("IfcStructuralSurfaceMember", Some("IfcStructuralMember")),
    ("IfcStructuralConnection", Some("IfcStructuralItem")),
    ("IfcStructuralPointConnection", Some("IfcStructuralConnection")),
    ("IfcStructuralCurveConnection", Some("IfcStructuralConnection")),
    ("IfcStructuralSurfaceConnection", Some("IfcStructuralConnection")),
    ("IfcSpatialElement", Some("IfcProduct")),
    ("IfcSpatialZone", Some("IfcSpatialElement")),
    ("IfcExternalSpatialElement", Some("IfcSpatialElement")),
    ("IfcSpatialStructureElement", Some("IfcSpatialElement")),
    ("IfcSite", Some("IfcSpatialStructureElement")),
    ("IfcFacility", Some("IfcSpatialStructureElement")),
    ("IfcBuilding", Some("IfcFacility")),
    ("IfcBridge", Some("IfcFacility")),
    ("IfcRoad", Some("IfcFacility")),
    ("IfcRailway", Some("IfcFacility")),
    ("IfcMarineFacility", Some("IfcFacility")),
    ("IfcFacilityPart", Some("IfcSpatialStructureElement")),
    ("IfcFacilityPartCommon", Some("IfcFacilityPart")),
    ("IfcBridgePart", Some("IfcFacilityPart")),
    ("IfcRoadPart", Some("IfcFacilityPart")),
    ("IfcRailwayPart", Some("IfcFacilityPart")),
    ("IfcBuildingStorey", Some("IfcSpatialStructureElement")),
    ("IfcSpace", Some("IfcSpatialStructureElement")),
    ("IfcElement", Some("IfcProduct")),
    ("IfcBuiltElement", Some("IfcElement")),
    ("IfcBuildingElement", Some("IfcElement")),
    ("IfcBeam", Some("IfcBuiltElement")),
    ("IfcBeamStandardCase", Some("IfcBeam")),
    ("IfcBearing", Some("IfcBuiltElement")),
    ("IfcBuildingElementProxy", Some("IfcBuiltElement")),
    ("IfcChimney", Some("IfcBuiltElement")),
    ("IfcColumn", Some("IfcBuiltElement")),
    ("IfcColumnStandardCase", Some("IfcColumn")),
    ("IfcCourse", Some("IfcBuiltElement")),
    ("IfcCovering", Some("IfcBuiltElement")),
    ("IfcCurtainWall", Some("IfcBuiltElement")),
    ("IfcDoor", Some("IfcBuiltElement")),
    ("IfcDoorStandardCase", Some("IfcDoor")),
    ("IfcEarthworksElement", Some("IfcBuiltElement")),
    ("IfcFooting", Some("IfcBuiltElement")),
    ("IfcKerb", Some("IfcBuiltElement")),
    ("IfcMember", Some("IfcBuiltElement")),
    ("IfcMemberStandardCase", Some("IfcMember")),
    ("IfcPavement", Some("IfcBuiltElement")),
    ("IfcPile", Some("IfcBuiltElement")),
    ("IfcPlate", Some("IfcBuiltElement")),
    ("IfcPlateStandardCase", Some("IfcPlate")),
    ("IfcRailing", Some("IfcBuiltElement")),
    ("IfcRamp", Some("IfcBuiltElement")),
    ("IfcRampFlight", Some("IfcBuiltElement")),
    ("IfcRoof", Some("IfcBuiltElement")),
    ("IfcShadingDevice", Some("IfcBuiltElement")),
    ("IfcSlab", Some("IfcBuiltElement")),
    ("IfcSlabElementedCase", Some("IfcSlab")),
    ("IfcSlabStandardCase", Some("IfcSlab")),
    ("IfcStair", Some("IfcBuiltElement")),
    ("IfcStairFlight", Some("IfcBuiltElement")),
    ("IfcWall", Some("IfcBuiltElement")),
    ("IfcWallElementedCase", Some("IfcWall")),
    ("IfcWallStandardCase", Some("IfcWall")),
    ("IfcWindow", Some("IfcBuiltElement")),
    ("IfcWindowStandardCase", Some("IfcWindow")),
    ("IfcCivilElement", Some("IfcElement")),
    ("IfcGeographicElement", Some("IfcElement")),
    ("IfcTransportElement", Some("IfcElement")),
    ("IfcVirtualElement", Some("IfcElement")),
    ("IfcElementAssembly", Some("IfcElement")),
    ("IfcFurnishingElement", Some("IfcElement")),
    ("IfcFurniture", Some("IfcFurnishingElement")),
    ("IfcSystemFurnitureElement", Some("IfcFurnishingElement")),
    ("IfcFeatureElement", Some("IfcElement")),
    ("IfcFeatureElementSubtraction", Some("IfcFeatureElement")),
    ("IfcOpeningElement", Some("IfcFeatureElementSubtraction")),
    ("IfcOpeningStandardCase", Some("IfcOpeningElement")),
    ("IfcVoidingFeature", Some("IfcFeatureElementSubtraction")),
    ("IfcFeatureElementAddition", Some("IfcFeatureElement")),
    ("IfcProjectionElement", Some("IfcFeatureElementAddition")),
    ("IfcSurfaceFeature", Some("IfcFeatureElement")),
    ("IfcElementComponent", Some("IfcElement")),
    ("IfcBuildingElementPart", Some("IfcElementComponent")),
    ("IfcDiscreteAccessory", Some("IfcElementComponent")),
    ("IfcFastener", Some("IfcElementComponent")),
    ("IfcMechanicalFastener", Some("IfcElementComponent")),
    ("IfcVibrationIsolator", Some("IfcElementComponent")),
    ("IfcImpactProtectionDevice", Some("IfcElementComponent")),
    ("IfcReinforcingElement", Some("IfcElementComponent")),
    ("IfcReinforcingBar", Some("IfcReinforcingElement")),
    ("IfcReinforcingMesh", Some("IfcReinforcingElement")),
    ("IfcTendon", Some("IfcReinforcingElement")),
    ("IfcTendonAnchor", Some("IfcReinforcingElement")),
    ("IfcTendonConduit", Some("IfcReinforcingElement")),
    ("IfcDistributionElement", Some("IfcElement")),
    ("IfcDistributionControlElement", Some("IfcDistributionElement")),
    ("IfcActuator", Some("IfcDistributionControlElement")),
    ("IfcAlarm", Some("IfcDistributionControlElement")),
    ("IfcController", Some("IfcDistributionControlElement")),
    ("IfcSensor", Some("IfcDistributionControlElement")),
    ("IfcDistributionFlowElement", Some("IfcDistributionElement")),
    ("IfcDistributionChamberElement", Some("IfcDistributionFlowElement")),
    ("IfcFlowSegment", Some("IfcDistributionFlowElement")),
    ("IfcCableCarrierSegment", Some("IfcFlowSegment")),
    ("IfcCableSegment", Some("IfcFlowSegment")),
    ("IfcDuctSegment", Some("IfcFlowSegment")),
    ("IfcPipeSegment", Some("IfcFlowSegment")),
    ("IfcFlowFitting", Some("IfcDistributionFlowElement")),
    ("IfcCableCarrierFitting", Some("IfcFlowFitting")),
    ("IfcCableFitting", Some("IfcFlowFitting")),
    ("IfcDuctFitting", Some("IfcFlowFitting")),
    ("IfcPipeFitting", Some("IfcFlowFitting")),
    ("IfcFlowTerminal", Some("IfcDistributionFlowElement")),
    ("IfcAirTerminal", Some("IfcFlowTerminal")),
    ("IfcFireSuppressionTerminal", Some("IfcFlowTerminal")),
    ("IfcLamp", Some("IfcFlowTerminal")),
    ("IfcLightFixture", Some("IfcFlowTerminal")),
    ("IfcOutlet", Some("IfcFlowTerminal")),
    ("IfcSanitaryTerminal", Some("IfcFlowTerminal")),
    ("IfcFlowController", Some("IfcDistributionFlowElement")),
    ("IfcDamper", Some("IfcFlowController")),
    ("IfcSwitchingDevice", Some("IfcFlowController")),
    ("IfcValve", Some("IfcFlowController")),
    ("IfcFlowMovingDevice", Some("IfcDistributionFlowElement")),
    ("IfcFan", Some("IfcFlowMovingDevice")),
    ("IfcPump", Some("IfcFlowMovingDevice")),
    ("IfcEnergyConversionDevice", Some("IfcDistributionFlowElement")),
    ("IfcBoiler", Some("IfcEnergyConversionDevice")),
    ("IfcChiller", Some("IfcEnergyConversionDevice")),
    ("IfcFlowStorageDevice", Some("IfcDistributionFlowElement")),
    ("IfcTank", Some("IfcFlowStorageDevice")),
    ("IfcFlowTreatmentDevice", Some("IfcDistributionFlowElement")),
    ("IfcFilter", Some("IfcFlowTreatmentDevice")),
    // Relationships
    ("IfcRelationship", Some("IfcRoot")),
    ("IfcRelDefines", Some("IfcRelationship")),
    ("IfcRelDefinesByProperties", Some("IfcRelDefines")),
    ("IfcRelDefinesByType", Some("IfcRelDefines")),
    ("IfcRelDefinesByObject", Some("IfcRelDefines")),
    ("IfcRelDefinesByTemplate", Some("IfcRelDefines")),
    ("IfcRelConnects", Some("IfcRelationship")),
    ("IfcRelContainedInSpatialStructure", Some("IfcRelConnects")),
    ("IfcRelReferencedInSpatialStructure", Some("IfcRelConnects")),
    ("IfcRelSequence", Some("IfcRelConnects")),
    ("IfcRelFillsElement", Some("IfcRelConnects")),
    ("IfcRelSpaceBoundary", Some("IfcRelConnects")),
    ("IfcRelConnectsElements", Some("IfcRelConnects")),
    ("IfcRelConnectsPathElements", Some("IfcRelConnectsElements")),
    ("IfcRelConnectsPortToElement", Some("IfcRelConnects")),
    ("IfcRelDecomposes", Some("IfcRelationship")),
    ("IfcRelAggregates", Some("IfcRelDecomposes")),
    ("IfcRelNests", Some("IfcRelDecomposes")),
    ("IfcRelVoidsElement", Some("IfcRelDecomposes")),
    ("IfcRelProjectsElement", Some("IfcRelDecomposes")),
    ("IfcRelAssigns", Some("IfcRelationship")),
    ("IfcRelAssignsToActor", Some("IfcRelAssigns")),
    ("IfcRelAssignsToControl", Some("IfcRelAssigns")),
    ("IfcRelAssignsToGroup", Some("IfcRelAssigns")),
    ("IfcRelAssignsToProcess", Some("IfcRelAssigns")),
    ("IfcRelAssignsToProduct", Some("IfcRelAssigns")),
    ("IfcRelAssignsToResource", Some("IfcRelAssigns")),
    ("IfcRelAssociates", Some("IfcRelationship")),
    ("IfcRelAssociatesClassification", Some("IfcRelAssociates")),
    ("IfcRelAssociatesDocument", Some("IfcRelAssociates")),
    ("IfcRelAssociatesMaterial", Some("IfcRelAssociates")),
    ("IfcRelDeclares", Some("IfcRelationship")),
    // Property definitions
    ("IfcPropertyDefinition", Some("IfcRoot")),
    ("IfcPropertySetDefinition", Some("IfcPropertyDefinition")),
    ("IfcPropertySet", Some("IfcPropertySetDefinition")),
    ("IfcPreDefinedPropertySet", Some("IfcPropertySetDefinition")),
    ("IfcQuantitySet", Some("IfcPropertySetDefinition")),
    ("IfcElementQuantity", Some("IfcQuantitySet")),
    ("IfcPropertyTemplateDefinition", Some("IfcPropertyDefinition")),
    ("IfcPropertySetTemplate", Some("IfcPropertyTemplateDefinition")),
    // Resources
    ("IfcPropertyAbstraction", None),
    ("IfcProperty", Some("IfcPropertyAbstraction")),
    ("IfcPropertyEnumeration", Some("IfcPropertyAbstraction")),
    ("IfcSimpleProperty", Some("IfcProperty")),
    ("IfcComplexProperty", Some("IfcProperty")),
    ("IfcPropertySingleValue", Some("IfcSimpleProperty")),
    ("IfcPropertyEnumeratedValue", Some("IfcSimpleProperty")),
    ("IfcPropertyListValue", Some("IfcSimpleProperty")),
    ("IfcPropertyBoundedValue", Some("IfcSimpleProperty")),
    ("IfcPropertyTableValue", Some("IfcSimpleProperty")),
    ("IfcPropertyReferenceValue", Some("IfcSimpleProperty")),
    ("IfcPhysicalQuantity", None),
    ("IfcPhysicalSimpleQuantity", Some("IfcPhysicalQuantity")),
    ("IfcPhysicalComplexQuantity", Some("IfcPhysicalQuantity")),
    ("IfcQuantityLength", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityArea", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityVolume", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityCount", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityWeight", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityTime", Some("IfcPhysicalSimpleQuantity")),
    ("IfcQuantityNumber", Some("IfcPhysicalSimpleQuantity")),
    ("IfcSchedulingTime", None),
    ("IfcTaskTime", Some("IfcSchedulingTime")),
    ("IfcTaskTimeRecurring", Some("IfcTaskTime")),
    ("IfcWorkTime", Some("IfcSchedulingTime")),
    ("IfcLagTime", Some("IfcSchedulingTime")),
    ("IfcRecurrencePattern", None),
    ("IfcTimePeriod", None),
    ("IfcOwnerHistory", None),
    ("IfcPerson", None),
    ("IfcOrganization", None),
    ("IfcPersonAndOrganization", None),
    ("IfcApplication", None),
    ("IfcAddress", None),
    ("IfcPostalAddress", Some("IfcAddress")),
    ("IfcNamedUnit", None),
    ("IfcSIUnit", Some("IfcNamedUnit")),
    ("IfcConversionBasedUnit", Some("IfcNamedUnit")),
    ("IfcDerivedUnit", None),
    ("IfcDerivedUnitElement", None),
    ("IfcUnitAssignment", None),
    ("IfcMeasureWithUnit", None),
    ("IfcDimensionalExponents", None),
    ("IfcMaterialDefinition", None),
    ("IfcMaterial", Some("IfcMaterialDefinition")),
    ("IfcMaterialLayer", Some("IfcMaterialDefinition")),
    ("IfcMaterialLayerSet", Some("IfcMaterialDefinition")),
    ("IfcMaterialProfile", Some("IfcMaterialDefinition")),
    ("IfcMaterialProfileSet", Some("IfcMaterialDefinition")),
    ("IfcMaterialConstituent", Some("IfcMaterialDefinition")),
    ("IfcMaterialConstituentSet", Some("IfcMaterialDefinition")),
    ("IfcMaterialUsageDefinition", None),
    ("IfcMaterialLayerSetUsage", Some("IfcMaterialUsageDefinition")),
    ("IfcMaterialProfileSetUsage", Some("IfcMaterialUsageDefinition")),
    ("IfcMaterialList", None),
    ("IfcExternalInformation", None),
    ("IfcClassification", Some("IfcExternalInformation")),
    ("IfcExternalReference", None),
    ("IfcClassificationReference", Some("IfcExternalReference")),
    // Geometry and presentation
    ("IfcRepresentationContext", None),
    ("IfcGeometricRepresentationContext", Some("IfcRepresentationContext")),
    ("IfcGeometricRepresentationSubContext", Some("IfcGeometricRepresentationContext")),
    ("IfcProductRepresentation", None),
    ("IfcProductDefinitionShape", Some("IfcProductRepresentation")),
    ("IfcRepresentation", None),
    ("IfcShapeModel", Some("IfcRepresentation")),
    ("IfcShapeRepresentation", Some("IfcShapeModel")),
    ("IfcRepresentationMap", None),
    ("IfcObjectPlacement", None),
    ("IfcLocalPlacement", Some("IfcObjectPlacement")),
    ("IfcRepresentationItem", None),
    ("IfcMappedItem", Some("IfcRepresentationItem")),
    ("IfcStyledItem", Some("IfcRepresentationItem")),
    ("IfcTopologicalRepresentationItem", Some("IfcRepresentationItem")),
    ("IfcConnectedFaceSet", Some("IfcTopologicalRepresentationItem")),
    ("IfcClosedShell", Some("IfcConnectedFaceSet")),
    ("IfcOpenShell", Some("IfcConnectedFaceSet")),
    ("IfcFace", Some("IfcTopologicalRepresentationItem")),
    ("IfcFaceBound", Some("IfcTopologicalRepresentationItem")),
    ("IfcFaceOuterBound", Some("IfcFaceBound")),
    ("IfcLoop", Some("IfcTopologicalRepresentationItem")),
    ("IfcPolyLoop", Some("IfcLoop")),
    ("IfcGeometricRepresentationItem", Some("IfcRepresentationItem")),
    ("IfcPoint", Some("IfcGeometricRepresentationItem")),
    ("IfcCartesianPoint", Some("IfcPoint")),
    ("IfcCartesianPointList", Some("IfcGeometricRepresentationItem")),
    ("IfcCartesianPointList2D", Some("IfcCartesianPointList")),
    ("IfcCartesianPointList3D", Some("IfcCartesianPointList")),
    ("IfcDirection", Some("IfcGeometricRepresentationItem")),
    ("IfcVector", Some("IfcGeometricRepresentationItem")),
    ("IfcPlacement", Some("IfcGeometricRepresentationItem")),
    ("IfcAxis2Placement2D", Some("IfcPlacement")),
    ("IfcAxis2Placement3D", Some("IfcPlacement")),
    ("IfcCartesianTransformationOperator3D", Some("IfcGeometricRepresentationItem")),
    ("IfcCurve", Some("IfcGeometricRepresentationItem")),
    ("IfcLine", Some("IfcCurve")),
    ("IfcConic", Some("IfcCurve")),
    ("IfcCircle", Some("IfcConic")),
    ("IfcEllipse", Some("IfcConic")),
    ("IfcBoundedCurve", Some("IfcCurve")),
    ("IfcPolyline", Some("IfcBoundedCurve")),
    ("IfcIndexedPolyCurve", Some("IfcBoundedCurve")),
    ("IfcCompositeCurve", Some("IfcBoundedCurve")),
    ("IfcCompositeCurveSegment", Some("IfcGeometricRepresentationItem")),
    ("IfcTrimmedCurve", Some("IfcBoundedCurve")),
    ("IfcSolidModel", Some("IfcGeometricRepresentationItem")),
    ("IfcSweptAreaSolid", Some("IfcSolidModel")),
    ("IfcExtrudedAreaSolid", Some("IfcSweptAreaSolid")),
    ("IfcManifoldSolidBrep", Some("IfcSolidModel")),
    ("IfcFacetedBrep", Some("IfcManifoldSolidBrep")),
    ("IfcHalfSpaceSolid", Some("IfcGeometricRepresentationItem")),
    ("IfcPolygonalBoundedHalfSpace", Some("IfcHalfSpaceSolid")),
    ("IfcBooleanResult", Some("IfcGeometricRepresentationItem")),
    ("IfcBooleanClippingResult", Some("IfcBooleanResult")),
    ("IfcTessellatedItem", Some("IfcGeometricRepresentationItem")),
    ("IfcIndexedPolygonalFace", Some("IfcTessellatedItem")),
    ("IfcTessellatedFaceSet", Some("IfcTessellatedItem")),
    ("IfcTriangulatedFaceSet", Some("IfcTessellatedFaceSet")),
    ("IfcPolygonalFaceSet", Some("IfcTessellatedFaceSet")),
    ("IfcProfileDef", None),
    ("IfcArbitraryClosedProfileDef", Some("IfcProfileDef")),
    ("IfcArbitraryProfileDefWithVoids", Some("IfcArbitraryClosedProfileDef")),
    ("IfcParameterizedProfileDef", Some("IfcProfileDef")),
    ("IfcRectangleProfileDef", Some("IfcParameterizedProfileDef")),
    ("IfcCircleProfileDef", Some("IfcParameterizedProfileDef")),
    ("IfcIShapeProfileDef", Some("IfcParameterizedProfileDef")),
    ("IfcLShapeProfileDef", Some("IfcParameterizedProfileDef")),
    ("IfcPresentationLayerAssignment", None),
    ("IfcPresentationStyle", None),
    ("IfcSurfaceStyle", Some("IfcPresentationStyle")),
    ("IfcSurfaceStyleShading", None),
    ("IfcSurfaceStyleRendering", Some("IfcSurfaceStyleShading")),
    ("IfcColourRgb", None),
];

/// Attributes declared directly on a class, in STEP order
const OWN_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("IfcRoot", &["GlobalId", "OwnerHistory", "Name", "Description"]),
    ("IfcObject", &["ObjectType"]),
    ("IfcContext", &["ObjectType", "LongName", "Phase", "RepresentationContexts", "UnitsInContext"]),
    ("IfcProduct", &["ObjectPlacement", "Representation"]),
    ("IfcElement", &["Tag"]),
    ("IfcSpatialElement", &["LongName"]),
    ("IfcSpatialStructureElement", &["CompositionType"]),
    ("IfcBuildingStorey", &["Elevation"]),
    ("IfcBuilding", &["ElevationOfRefHeight", "ElevationOfTerrain", "BuildingAddress"]),
    ("IfcSite", &["RefLatitude", "RefLongitude", "RefElevation", "LandTitleNumber", "SiteAddress"]),
    ("IfcSpace", &["PredefinedType", "ElevationWithFlooring"]),
    ("IfcTypeObject", &["ApplicableOccurrence", "HasPropertySets"]),
    ("IfcTypeProduct", &["RepresentationMaps", "Tag"]),
    ("IfcElementType", &["ElementType"]),
    ("IfcDoorType", &["PredefinedType", "OperationType", "ParameterTakesPrecedence", "UserDefinedOperationType"]),
    ("IfcWindowType", &["PredefinedType", "PartitioningType", "ParameterTakesPrecedence", "UserDefinedPartitioningType"]),
    ("IfcDoor", &["OverallHeight", "OverallWidth", "PredefinedType", "OperationType", "UserDefinedOperationType"]),
    ("IfcWindow", &["OverallHeight", "OverallWidth", "PredefinedType", "PartitioningType", "UserDefinedPartitioningType"]),
    ("IfcReinforcingElement", &["SteelGrade"]),
    ("IfcReinforcingBar", &["NominalDiameter", "CrossSectionArea", "BarLength", "PredefinedType", "BarSurface"]),
    (
        "IfcReinforcingMesh",
        &[
            "MeshLength",
            "MeshWidth",
            "LongitudinalBarNominalDiameter",
            "TransverseBarNominalDiameter",
            "LongitudinalBarCrossSectionArea",
            "TransverseBarCrossSectionArea",
            "LongitudinalBarSpacing",
            "TransverseBarSpacing",
            "PredefinedType",
        ],
    ),
    (
        "IfcTendon",
        &[
            "PredefinedType",
            "NominalDiameter",
            "CrossSectionArea",
            "TensionForce",
            "PreStress",
            "FrictionCoefficient",
            "AnchorageSlip",
            "MinCurvatureRadius",
        ],
    ),
    ("IfcPile", &["PredefinedType", "ConstructionType"]),
    ("IfcStructuralConnection", &["AppliedCondition"]),
    ("IfcStructuralCurveMember", &["PredefinedType", "Axis"]),
    ("IfcStructuralSurfaceMember", &["PredefinedType", "Thickness"]),
    ("IfcProcess", &["Identification", "LongDescription"]),
    ("IfcTask", &["Status", "WorkMethod", "IsMilestone", "Priority", "TaskTime", "PredefinedType"]),
    ("IfcControl", &["Identification"]),
    ("IfcWorkControl", &["CreationDate", "Creators", "Purpose", "Duration", "TotalFloat", "StartTime", "FinishTime"]),
    ("IfcWorkSchedule", &["PredefinedType"]),
    ("IfcWorkPlan", &["PredefinedType"]),
    ("IfcWorkCalendar", &["WorkingTimes", "ExceptionTimes", "PredefinedType"]),
    ("IfcPropertySet", &["HasProperties"]),
    ("IfcElementQuantity", &["MethodOfMeasurement", "Quantities"]),
    ("IfcRelDefinesByProperties", &["RelatedObjects", "RelatingPropertyDefinition"]),
    ("IfcRelDefinesByType", &["RelatedObjects", "RelatingType"]),
    ("IfcRelContainedInSpatialStructure", &["RelatedElements", "RelatingStructure"]),
    ("IfcRelAggregates", &["RelatingObject", "RelatedObjects"]),
    ("IfcRelNests", &["RelatingObject", "RelatedObjects"]),
    ("IfcRelVoidsElement", &["RelatingBuildingElement", "RelatedOpeningElement"]),
    ("IfcRelFillsElement", &["RelatingOpeningElement", "RelatedBuildingElement"]),
    ("IfcRelAssigns", &["RelatedObjects", "RelatedObjectsType"]),
    ("IfcRelAssignsToControl", &["RelatingControl"]),
    ("IfcRelAssignsToProcess", &["RelatingProcess", "QuantityInProcess"]),
    ("IfcRelAssignsToProduct", &["RelatingProduct"]),
    ("IfcRelAssignsToGroup", &["RelatingGroup"]),
    ("IfcRelSequence", &["RelatingProcess", "RelatedProcess", "TimeLag", "SequenceType", "UserDefinedSequenceType"]),
    ("IfcRelDeclares", &["RelatingContext", "RelatedDefinitions"]),
    ("IfcRelAssociatesMaterial", &["RelatedObjects", "RelatingMaterial"]),
    ("IfcRelAssociatesClassification", &["RelatedObjects", "RelatingClassification"]),
    ("IfcProperty", &["Name", "Description"]),
    ("IfcPropertySingleValue", &["NominalValue", "Unit"]),
    ("IfcPropertyEnumeratedValue", &["EnumerationValues", "EnumerationReference"]),
    ("IfcPropertyListValue", &["ListValues", "Unit"]),
    ("IfcPropertyBoundedValue", &["UpperBoundValue", "LowerBoundValue", "Unit", "SetPointValue"]),
    ("IfcComplexProperty", &["UsageName", "HasProperties"]),
    ("IfcPhysicalQuantity", &["Name", "Description"]),
    ("IfcPhysicalSimpleQuantity", &["Unit"]),
    ("IfcQuantityLength", &["LengthValue", "Formula"]),
    ("IfcQuantityArea", &["AreaValue", "Formula"]),
    ("IfcQuantityVolume", &["VolumeValue", "Formula"]),
    ("IfcQuantityCount", &["CountValue", "Formula"]),
    ("IfcQuantityWeight", &["WeightValue", "Formula"]),
    ("IfcQuantityTime", &["TimeValue", "Formula"]),
    ("IfcQuantityNumber", &["NumberValue", "Formula"]),
    ("IfcPhysicalComplexQuantity", &["HasQuantities", "Discrimination", "Quality", "Usage"]),
    ("IfcSchedulingTime", &["Name", "DataOrigin", "UserDefinedDataOrigin"]),
    (
        "IfcTaskTime",
        &[
            "DurationType",
            "ScheduleDuration",
            "ScheduleStart",
            "ScheduleFinish",
            "EarlyStart",
            "EarlyFinish",
            "LateStart",
            "LateFinish",
            "FreeFloat",
            "TotalFloat",
            "IsCritical",
            "StatusTime",
            "ActualDuration",
            "ActualStart",
            "ActualFinish",
            "RemainingTime",
            "Completion",
        ],
    ),
    ("IfcWorkTime", &["RecurrencePattern", "Start", "Finish"]),
    ("IfcLagTime", &["LagValue", "DurationType"]),
];

/// Classes whose only own attribute is PredefinedType
const PREDEFINED_ONLY: &[&str] = &[
    "IfcBeam",
    "IfcBearing",
    "IfcBuildingElementProxy",
    "IfcChimney",
    "IfcColumn",
    "IfcCourse",
    "IfcCovering",
    "IfcCurtainWall",
    "IfcEarthworksElement",
    "IfcFooting",
    "IfcKerb",
    "IfcMember",
    "IfcPavement",
    "IfcPlate",
    "IfcRailing",
    "IfcRamp",
    "IfcRampFlight",
    "IfcRoof",
    "IfcShadingDevice",
    "IfcSlab",
    "IfcStair",
    "IfcStairFlight",
    "IfcWall",
    "IfcTendonAnchor",
    "IfcElementAssembly",
    "IfcFurniture",
    "IfcOpeningElement",
    "IfcDiscreteAccessory",
    "IfcMechanicalFastener",
    "IfcFastener",
    "IfcBeamType",
    "IfcBearingType",
    "IfcBuildingElementProxyType",
    "IfcColumnType",
    "IfcCoveringType",
    "IfcCurtainWallType",
    "IfcFootingType",
    "IfcMemberType",
    "IfcPileType",
    "IfcPlateType",
    "IfcRailingType",
    "IfcRampFlightType",
    "IfcRampType",
    "IfcRoofType",
    "IfcSlabType",
    "IfcStairFlightType",
    "IfcStairType",
    "IfcWallType",
];

struct ClassTable {
    /// upper case name -> index into CLASSES
    by_upper: FxHashMap<String, usize>,
}

fn table() -> &'static ClassTable {
    static TABLE: OnceLock<ClassTable> = OnceLock::new();
    TABLE.get_or_init(|| ClassTable {
        by_upper: CLASSES
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_ascii_uppercase(), i))
            .collect(),
    })
}

fn lookup(class: &str) -> Option<(&'static str, Option<&'static str>)> {
    let upper = class.to_ascii_uppercase();
    table().by_upper.get(&upper).map(|&i| CLASSES[i])
}

/// IFC4 and IFC4X3 names for the same abstract supertypes
fn aliased(class: &str) -> &str {
    if class.eq_ignore_ascii_case("IfcBuildingElement") {
        "IfcBuiltElement"
    } else if class.eq_ignore_ascii_case("IfcBuildingElementType") {
        "IfcBuiltElementType"
    } else {
        class
    }
}

/// PascalCase spelling of a class name given in any case
///
/// Unknown names are title-cased after the `Ifc` prefix.
pub fn canonical_name(class: &str) -> Cow<'static, str> {
    if let Some((name, _)) = lookup(class) {
        return Cow::Borrowed(name);
    }
    let lower = class.to_ascii_lowercase();
    let rest = lower.strip_prefix("ifc").unwrap_or(&lower);
    let mut chars = rest.chars();
    let mut out = String::from(if lower.starts_with("ifc") { "Ifc" } else { "" });
    if let Some(first) = chars.next() {
        out.push(first.to_ascii_uppercase());
        out.extend(chars);
    }
    Cow::Owned(out)
}

pub fn supertype(class: &str) -> Option<&'static str> {
    lookup(class).and_then(|(_, parent)| parent)
}

/// Class followed by its supertypes, most derived first
pub fn ancestry(class: &str) -> Vec<Cow<'static, str>> {
    let mut chain = vec![canonical_name(class)];
    let mut current = supertype(class);
    while let Some(parent) = current {
        chain.push(Cow::Borrowed(parent));
        current = supertype(parent);
    }
    chain
}

/// True when `class` equals `parent` or inherits from it
pub fn is_subtype_of(class: &str, parent: &str) -> bool {
    let parent = aliased(parent);
    ancestry(class)
        .iter()
        .any(|ancestor| aliased(ancestor).eq_ignore_ascii_case(parent))
}

/// Full attribute name list for a class, inherited attributes first
///
/// Classes without a row of their own contribute nothing, so the list may be
/// shorter than the record; callers label the rest positionally.
pub fn attribute_names(class: &str) -> Vec<&'static str> {
    let mut names = Vec::new();
    for ancestor in ancestry(class).iter().rev() {
        if let Some((_, own)) = OWN_ATTRIBUTES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ancestor))
        {
            names.extend_from_slice(own);
        } else if PREDEFINED_ONLY
            .iter()
            .any(|name| name.eq_ignore_ascii_case(ancestor))
        {
            names.push("PredefinedType");
        }
    }
    names
}

/// Position of a named attribute in the record of `class`
pub fn attribute_index(class: &str, attribute: &str) -> Option<usize> {
    attribute_names(class)
        .iter()
        .position(|name| name.eq_ignore_ascii_case(attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("IFCWALLSTANDARDCASE"), "IfcWallStandardCase");
        assert_eq!(canonical_name("ifcrelaggregates"), "IfcRelAggregates");
        assert_eq!(canonical_name("IFCSOMETHINGNEW"), "IfcSomethingnew");
    }

    #[test]
    fn test_subtypes() {
        assert!(is_subtype_of("IFCWALLSTANDARDCASE", "IfcWall"));
        assert!(is_subtype_of("IfcWall", "IfcElement"));
        assert!(is_subtype_of("IfcWall", "IfcBuildingElement"));
        assert!(is_subtype_of("IfcBuilding", "IfcSpatialStructureElement"));
        assert!(is_subtype_of("IfcTask", "IfcProcess"));
        assert!(!is_subtype_of("IfcWall", "IfcSlab"));
        assert!(!is_subtype_of("IfcPropertySingleValue", "IfcRoot"));
        assert!(is_subtype_of("IfcUnknownThing", "IfcUnknownThing"));
    }

    #[test]
    fn test_attribute_positions() {
        assert_eq!(attribute_index("IfcWall", "PredefinedType"), Some(8));
        assert_eq!(attribute_index("IfcWallStandardCase", "PredefinedType"), Some(8));
        assert_eq!(attribute_index("IfcDoor", "PredefinedType"), Some(10));
        assert_eq!(attribute_index("IfcReinforcingBar", "PredefinedType"), Some(12));
        assert_eq!(attribute_index("IfcWallType", "PredefinedType"), Some(9));
        assert_eq!(attribute_index("IfcPropertySet", "PredefinedType"), None);
        assert_eq!(attribute_index("IfcDoorType", "PredefinedType"), Some(9));
        assert_eq!(attribute_index("IfcTask", "TaskTime"), Some(11));
        assert_eq!(attribute_index("IfcWorkSchedule", "StartTime"), Some(11));
        assert_eq!(attribute_index("IfcWorkCalendar", "ExceptionTimes"), Some(7));
        assert_eq!(attribute_index("IfcBuildingStorey", "Elevation"), Some(9));
        assert_eq!(attribute_index("IfcProject", "UnitsInContext"), Some(8));
        assert_eq!(attribute_index("IfcRelSequence", "SequenceType"), Some(7));
        assert_eq!(attribute_index("IfcQuantityArea", "AreaValue"), Some(3));
        assert_eq!(attribute_index("IfcTaskTime", "ScheduleStart"), Some(5));
        assert_eq!(attribute_index("IfcWorkTime", "Start"), Some(4));
    }
}
