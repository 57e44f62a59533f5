//! Standard RDF vocabularies (RDF, RDFS, OWL, XSD)

/// Standard RDF/RDFS/OWL/XSD vocabularies
pub struct Vocabulary;

impl Vocabulary {
    // RDF namespace
    /// RDF namespace IRI
    pub const RDF_NS: &'static str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// rdf:type - indicates class membership
    pub const RDF_TYPE: &'static str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    /// rdf:Property - class of RDF properties
    pub const RDF_PROPERTY: &'static str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
    /// rdf:langString - datatype of language-tagged literals
    pub const RDF_LANG_STRING: &'static str =
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

    // RDFS namespace
    /// RDFS namespace IRI
    pub const RDFS_NS: &'static str = "http://www.w3.org/2000/01/rdf-schema#";
    /// rdfs:Resource - class of all resources
    pub const RDFS_RESOURCE: &'static str = "http://www.w3.org/2000/01/rdf-schema#Resource";
    /// rdfs:Class - class of classes
    pub const RDFS_CLASS: &'static str = "http://www.w3.org/2000/01/rdf-schema#Class";
    /// rdfs:subClassOf - indicates class hierarchy
    pub const RDFS_SUBCLASSOF: &'static str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    /// rdfs:subPropertyOf - indicates property hierarchy
    pub const RDFS_SUBPROPERTYOF: &'static str =
        "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
    /// rdfs:domain - domain of a property
    pub const RDFS_DOMAIN: &'static str = "http://www.w3.org/2000/01/rdf-schema#domain";
    /// rdfs:range - range of a property
    pub const RDFS_RANGE: &'static str = "http://www.w3.org/2000/01/rdf-schema#range";
    /// rdfs:label - human-readable label
    pub const RDFS_LABEL: &'static str = "http://www.w3.org/2000/01/rdf-schema#label";

    // OWL namespace
    /// OWL namespace IRI
    pub const OWL_NS: &'static str = "http://www.w3.org/2002/07/owl#";
    /// owl:Class - class of OWL classes
    pub const OWL_CLASS: &'static str = "http://www.w3.org/2002/07/owl#Class";
    /// owl:TransitiveProperty - transitive property
    pub const OWL_TRANSITIVE_PROPERTY: &'static str =
        "http://www.w3.org/2002/07/owl#TransitiveProperty";
    /// owl:SymmetricProperty - symmetric property
    pub const OWL_SYMMETRIC_PROPERTY: &'static str =
        "http://www.w3.org/2002/07/owl#SymmetricProperty";
    /// owl:equivalentClass - indicates equivalent classes
    pub const OWL_EQUIVALENT_CLASS: &'static str =
        "http://www.w3.org/2002/07/owl#equivalentClass";
    /// owl:equivalentProperty - indicates equivalent properties
    pub const OWL_EQUIVALENT_PROPERTY: &'static str =
        "http://www.w3.org/2002/07/owl#equivalentProperty";
    /// owl:sameAs - indicates identical individuals
    pub const OWL_SAME_AS: &'static str = "http://www.w3.org/2002/07/owl#sameAs";
    /// owl:inverseOf - indicates inverse properties
    pub const OWL_INVERSE_OF: &'static str = "http://www.w3.org/2002/07/owl#inverseOf";

    // XSD namespace
    /// XSD namespace IRI
    pub const XSD_NS: &'static str = "http://www.w3.org/2001/XMLSchema#";
    /// xsd:string - string datatype
    pub const XSD_STRING: &'static str = "http://www.w3.org/2001/XMLSchema#string";
    /// xsd:integer - arbitrary-precision integer
    pub const XSD_INTEGER: &'static str = "http://www.w3.org/2001/XMLSchema#integer";
    /// xsd:double - double-precision floating point
    pub const XSD_DOUBLE: &'static str = "http://www.w3.org/2001/XMLSchema#double";
    /// xsd:decimal - arbitrary-precision decimal
    pub const XSD_DECIMAL: &'static str = "http://www.w3.org/2001/XMLSchema#decimal";
    /// xsd:boolean - boolean datatype (true/false)
    pub const XSD_BOOLEAN: &'static str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// xsd:dateTime - date and time with optional timezone
    pub const XSD_DATETIME: &'static str = "http://www.w3.org/2001/XMLSchema#dateTime";

    /// Check whether an IRI names an XSD numeric datatype
    pub fn is_numeric_datatype(iri: &str) -> bool {
        matches!(
            iri,
            Vocabulary::XSD_INTEGER | Vocabulary::XSD_DOUBLE | Vocabulary::XSD_DECIMAL
        ) || iri == "http://www.w3.org/2001/XMLSchema#float"
            || iri == "http://www.w3.org/2001/XMLSchema#int"
            || iri == "http://www.w3.org/2001/XMLSchema#long"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_prefixes() {
        assert!(Vocabulary::RDF_TYPE.starts_with(Vocabulary::RDF_NS));
        assert!(Vocabulary::RDFS_SUBCLASSOF.starts_with(Vocabulary::RDFS_NS));
        assert!(Vocabulary::OWL_SAME_AS.starts_with(Vocabulary::OWL_NS));
        assert!(Vocabulary::XSD_STRING.starts_with(Vocabulary::XSD_NS));
    }

    #[test]
    fn test_numeric_datatypes() {
        assert!(Vocabulary::is_numeric_datatype(Vocabulary::XSD_INTEGER));
        assert!(!Vocabulary::is_numeric_datatype(Vocabulary::XSD_STRING));
    }
}
