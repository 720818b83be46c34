//! Example: Building a pedigree through an editor session
//!
//! This example builds a three-generation family with the session API,
//! tracks a disorder legend, undoes an edit and prints the resulting
//! layout and document.

use std::{cell::RefCell, rc::Rc};

use pedigree::{
    EditorSession,
    attributes::Gender,
    identifier::TermId,
    legend::Legend,
    properties::{PartnershipProperties, PersonProperties, PropertyKey, PropertyValue},
    structure::CascadePolicy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = EditorSession::default();
    let legend = Rc::new(RefCell::new(Legend::disorders()));
    session.subscribe(legend.clone());

    // Grandparents and their two children
    let grandfather = session.add_person(None, PersonProperties::with_gender(Gender::Male))?;
    let grandmother = session.add_person(None, PersonProperties::with_gender(Gender::Female))?;
    let (grandparents, _) =
        session.add_partnership(grandfather, grandmother, PartnershipProperties::default())?;
    let mother = session.add_person(
        Some(grandparents),
        PersonProperties::with_gender(Gender::Female),
    )?;
    let uncle = session.add_person(Some(grandparents), PersonProperties::with_gender(Gender::Male))?;

    // The mother's family
    let father = session.add_person(None, PersonProperties::with_gender(Gender::Male))?;
    let (parents, _) = session.add_partnership(mother, father, PartnershipProperties::default())?;
    let proband = session.add_person(Some(parents), PersonProperties::default())?;
    session.add_person_group(Some(parents), 3, PersonProperties::default())?;

    let huntington = TermId::new("Huntington disease");
    for id in [grandmother, mother, proband] {
        session.set_property(
            id,
            PropertyKey::Disorders,
            PropertyValue::Terms(vec![huntington]),
        )?;
    }
    session.set_property(proband, PropertyKey::Proband, PropertyValue::Bool(true))?;

    // A mistaken removal, taken back
    session.remove_node(uncle, CascadePolicy::default())?;
    session.undo()?;

    println!("Layout:");
    for (rank, ids) in session.layout().ranks().iter().enumerate() {
        let row: Vec<String> = ids
            .iter()
            .filter_map(|&id| {
                let placement = session.placement(id)?;
                Some(format!(
                    "{}:{}@{:.1}",
                    placement.kind().as_str(),
                    id,
                    placement.position().x()
                ))
            })
            .collect();
        println!("  rank {rank}: {}", row.join("  "));
    }

    println!("\nLegend:");
    for (term, entry) in legend.borrow().entries() {
        println!(
            "  {} ({} cases, color {})",
            term.as_string(),
            entry.cases().len(),
            entry.color()
        );
    }

    println!("\nDocument:\n{}", session.serialize().to_json()?);
    Ok(())
}
