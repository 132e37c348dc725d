//! Prompt text for C-P-P extraction and the ReAct agent.

/// Few-shot Composition-Process-Property examples drawn from the
/// interconnect-metallization literature the corpus targets.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str, &str)] = &[
    (
        "Cu",
        "Fabrication of Cu damascene interconnects followed by electromigration (EM) testing; variation in line width, thickness, and grain structure (bamboo, polycrystalline, etc.)",
        "EM lifetime: bamboo > polycrystalline; bamboo structures have fewer grain boundaries, reducing atomic diffusion paths",
    ),
    (
        "Cu, Ti",
        "Use of Cu(2.5%Ti) alloy as a seed layer; annealing at 100-250C before CMP to promote bamboo grain structure",
        "EM lifetime: more than 5x improvement with Ti doping; Ti stabilizes grain boundaries; resistivity increases by ~17%",
    ),
    (
        "Cu, H2 plasma-treated interface",
        "H2-based plasma pre-treatment on Cu surface before dielectric deposition",
        "Over 10x increase in EM lifetime; silicide-like barrier forms at the interface; resistivity roughly doubles",
    ),
    (
        "Cu (various linewidths)",
        "Fabrication of interconnects with 0.09-1.9 um width; comparison of samples with and without pre-CMP annealing",
        "EM lifetime improves with annealing due to bamboo grain formation; bamboo structure is harder to form in narrow lines",
    ),
    (
        "Cu, Al",
        "PVD Cu(2at.%Al) seed -> ECD Cu -> 400C annealing",
        "EM activation energy: 1.15+-0.1eV (vs pure Cu 0.85eV) / Interface diffusivity reduction",
    ),
    (
        "Cu, Mn",
        "PVD Cu(0.5at.%Mn) seed -> Post-CMP annealing at 400C",
        "Q_GB: 0.77+-0.05eV / Z*_GB: -0.4 / Bamboo grain blocking effect",
    ),
    (
        "Co, Cr",
        "DC magnetron sputtering -> 450C 2hr annealing in N2",
        "Breakdown voltage: 31.2V (200% up vs pure Co) / 1.2nm Cr2O3 barrier formation",
    ),
    (
        "Cu, Sn",
        "Deposition using RF magnetron sputtering on TaN film; Sn at 30W (62nm/min), Cu at 100W (57nm/min); TaN substrate cleaned 1min in 100C ammonia/H2O2 solution; annealing at 550C for 60min in H2 (400Pa) ambient",
        "Agglomeration: CuSn alloys higher than pure Cu; melting point: CuSn alloys lower than pure Cu; bond strength: Sn-O 531.8kJ/mol vs Cu-O 269.0kJ/mol",
    ),
    (
        "Ru, Ta",
        "Deposition using PVD in Ar and N2 ambient: RuTa -> RuTa(N) -> Cu; 10% Ta used; nitrogen doping applied",
        "Resistivity: RuTa < RuTa(N) < Ta / Barrier performance: RuTa(N) ~ RuTa > Ta / EM lifetime: RuTa > Ta (better wettability reduces sidewall agglomeration)",
    ),
    (
        "Cu, Mg",
        "DC magnetron sputtering; Cu or Cu-5%Mg alloy; deposition power 150W/250W; annealing at 200-500C for 5-60 min",
        "Resistivity (after 350C annealing): Cu 1.8uOhm-cm, Cu(Mg) 2.0uOhm-cm / Debonding energy (SiO2): Cu 8.76, Cu(Mg) 20.1 J/m2 / Lifetime: Cu 2.7h, Cu(Mg) 29.1h",
    ),
    (
        "Ag, Cu",
        "Single crystal grown using Czochralski method; alloy prepared by furnace cooling from melt",
        "Single crystal Ag: 1.49uOhm-cm / Single crystal Ag-3%Cu: 1.35uOhm-cm / Alloy Ag-3%Cu: 1.76uOhm-cm",
    ),
    (
        "Zn, Cd, Be, Mg",
        "Submonolayer to monolayer doping (10-90% grain boundary coverage), targeting Sigma-13a and Sigma-17 grain boundaries",
        "Specific grain-boundary resistivity decreased at Sigma-13a and Sigma-17 boundaries",
    ),
];

pub fn few_shot_examples_block() -> String {
    FEW_SHOT_EXAMPLES
        .iter()
        .map(|(composition, process, property)| {
            format!(
                "composition : {}\nprocess : {}\nproperty : {}",
                composition, process, property
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt for the C-P-P extraction step during ingestion. The model must
/// answer with a single JSON object.
pub fn cpp_extraction_prompt(text: &str) -> String {
    format!(
        r#"You are an AI assistant specializing in materials science. Your task is to extract Composition-Process-Property (C-P-P) data from the given text.
The material should be a metallic alloy suitable for semiconductor interconnects.

Based on the text below, extract the C-P-P data and provide it in JSON format.

**GUIDELINES:**
- **Composition:** Identify the metallic elements and their proportions.
- **Process:** Briefly describe the manufacturing or experimental process.
- **Property:** List the key properties of the alloy.
- If any information is not available, use "N/A".

**REFERENCE EXAMPLES:**
{examples}

**FEW-SHOT EXAMPLES:**
---
Text: "We investigated Cu-Mg alloys... DC magnetron sputtering was used... annealing at 350C... The resistivity of Cu(Mg) was 2.0uOhm-cm, and the debonding energy with SiO2 was 20.1 J/m2."
JSON Output:
{{
    "composition": "Cu, Mg",
    "process": "DC magnetron sputtering; annealing at 350C",
    "property": "Resistivity: 2.0uOhm-cm, Debonding energy (SiO2): 20.1 J/m2"
}}
---
Text: "PVD Cu(2at.%Al) seed was deposited, followed by ECD Cu and 400C annealing. This process resulted in an EM activation energy of 1.15+-0.1eV."
JSON Output:
{{
    "composition": "Cu, Al (2 at.%)",
    "process": "PVD Cu(Al) seed -> ECD Cu -> 400C annealing",
    "property": "EM activation energy: 1.15+-0.1eV"
}}
---

**TEXT TO ANALYZE:**
{text}

**JSON OUTPUT FORMAT:**
Respond with a single JSON object with exactly the string fields "composition", "process", and "property". Do not add commentary outside the JSON object.
"#,
        examples = few_shot_examples_block(),
        text = text,
    )
}

/// System prompt for the ReAct agent, rendered with the live tool list.
pub fn react_system_prompt(tool_descriptions: &str, tool_names: &[String]) -> String {
    format!(
        r#"You are a materials science research agent using the ReAct framework.

You have access to the following tools:
{tools}

Use the following format:

Thought: [Analyze query -> decide tool]
Action: The action to take, should be one of [{tool_names}]
Action Input: [query for the tool]
Observation: [tool result]
...(repeat Thought/Action/Observation as needed)
Final Answer: [synthesize all observations with citations]

=== GUIDELINES ===

1. QUERY ANALYSIS:
   - Understand user intent regardless of language (Korean, English, etc.)
   - Break down complex queries into sub-tasks
   - Determine which tools are needed

2. TOOL CONSTRAINTS:
   - **vectordb_search**: Primary tool for experimental data from papers. Accepts any query format. Use first for material properties, processes, compositions.
   - **materials_project**: DFT calculation data only. Input must be exact chemical formula (e.g., "Cu2O", "CuMg"). No experimental data. Use for theoretical properties.
   - **crossref_search**: Latest academic papers. English-only database. Translate non-English queries. Use for recent research (2020+).
   - **web_search**: General web information, news, industry trends. Last resort when other tools insufficient. May return outdated or unreliable data.

   **TOOL SELECTION RULES:**
   - Start with vectordb_search for experimental/material data
   - Use materials_project only for theoretical calculations
   - Reserve crossref_search for recent publications
   - Use web_search sparingly and verify information
   - If primary tool fails, try alternatives but note limitations

3. ITERATIVE REASONING:
   - Use multiple tools if needed for comprehensive answers
   - If a tool returns insufficient results, try reformulating or use alternative tools
   - Verify and cross-reference data from multiple sources

4. RESPONSE QUALITY:
   - Always cite specific sources with values
   - Synthesize information from all tools used
   - If tools fail or return no results, acknowledge limitations

=== EXAMPLE ===
User: "Resistivity of Cu-Mg alloys?"
Thought: Need experimental resistivity data. Try vectordb first.
Action: vectordb_search
Action Input: Cu-Mg alloy resistivity
Observation: [experimental data found]
Thought: Got experimental data. Check theoretical properties too.
Action: materials_project
Action Input: CuMg
Observation: [DFT calculation data]
Final Answer: [synthesis with citations from both sources]

Begin!
"#,
        tools = tool_descriptions,
        tool_names = tool_names.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_text_and_examples() {
        let prompt = cpp_extraction_prompt("sample chunk");
        assert!(prompt.contains("sample chunk"));
        assert!(prompt.contains("composition : Cu, Ti"));
        assert!(prompt.contains("JSON object"));
    }

    #[test]
    fn react_prompt_lists_tool_names() {
        let names = vec!["vectordb_search".to_string(), "web_search".to_string()];
        let prompt = react_system_prompt("vectordb_search: search papers", &names);
        assert!(prompt.contains("[vectordb_search, web_search]"));
        assert!(prompt.contains("Final Answer:"));
    }
}
