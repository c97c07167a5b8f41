//! Fixed prompts for the classify and tag stages
//!
//! Both prompts are deterministic functions of the paper's title and
//! abstract: system rubric, worked examples, then the paper itself.

use crate::services::llm_client::CompletionRequest;
use hwlit_common::Tag;

/// Output cap for classification (one token: "true"/"false")
pub const CLASSIFY_MAX_TOKENS: u32 = 1;

/// Output cap for tagging (up to three short labels)
pub const TAG_MAX_TOKENS: u32 = 40;

const CLASSIFY_SYSTEM: &str = "\
You are an expert research assistant. Your task is to classify academic papers based on their title and abstract.
The goal is to identify if a paper's contribution is 'AI for Systems/Architecture/Hardware'.

A paper is 'AI for Systems/Architecture/Hardware' (respond with 'true') if it applies AI/ML/LLM techniques to solve traditional problems in computer systems, architecture, or hardware engineering. Examples include using AI for:
- Chip design (placement, routing, verification, EDA)
- System-level optimization
- Compilers or code generation for hardware
- Designing network-on-chip or memory architectures

A paper is NOT in this category (respond with 'false') if its primary focus is on 'Systems/Architecture/Hardware for AI'. This includes:
- Designing hardware accelerators for AI/ML models (e.g., custom ASICs, FPGAs for neural networks).
- Proposing new neural network algorithms that are hardware-efficient.
- Improving the performance of AI computations on a specific hardware platform.

--- EXAMPLE 1 (Correct answer: true) ---
Title: \"A Machine Learning Framework for Register Placement Optimization in Digital Circuit Design\"
Abstract: \"In modern digital circuit back-end design, ... we propose a machine learning framework that helps to define what are the guidelines and constraints for registers placement...\"
Reasoning: This paper uses machine learning to solve a specific problem in digital circuit design (register placement). This is a clear case of 'AI for Systems/Architecture/Hardware'.

--- EXAMPLE 2 (Correct answer: false) ---
Title: \"L1-Norm Batch Normalization for Efficient Training of Deep Neural Networks\"
Abstract: \"Batch Normalization (BN) has been proven to be quite effective at accelerating and improving the training of deep neural networks... This hardware-friendly normalization method ... simplify the hardware design of ASIC accelerators...\"
Reasoning: This paper's goal is to accelerate AI training by making an algorithm more hardware-friendly. This is 'Systems/Architecture/Hardware for AI'.
--- END OF EXAMPLES ---

Now, classify the following paper. Respond with a single word: 'true' or 'false'.";

const TAG_DESCRIPTIONS: &str = "\
Here are explanations for each tag:
- **Verification**: Using AI/ML for formal verification, simulation, or validation of hardware designs.
- **Synthesis**: Using AI/ML for high-level synthesis (HLS), logic synthesis, or generating hardware from high-level descriptions.
- **P&R**: Using AI/ML for physical design tasks like placement, routing, and clock tree synthesis.
- **Analog Design**: Using AI/ML for the design, optimization, or layout of analog, RF, or mixed-signal circuits.
- **System-level Optimization**: Using AI/ML to optimize system-level concerns like architecture, power, performance, or resource management (e.g., cache policies, NoC routing, memory controllers).
- **Code Generation**: Using AI/ML to generate or optimize hardware description languages (e.g., Verilog, VHDL) or related code.
- **Security**: Using AI/ML to address hardware security challenges, such as detecting vulnerabilities, side-channel attacks, or Trojans.
- **Testing**: Using AI/ML for post-silicon validation, test pattern generation, or fault diagnosis.
- **Other**: If the paper's main contribution does not fit well into any of the above categories.";

const TAG_EXAMPLES: &str = "\
--- EXAMPLE 1 ---
Title: \"A Deep-Learning-Based Framework for Routing Congestion Prediction in High-Performance Processors\"
Abstract: \"We propose a novel framework that uses a convolutional neural network to predict routing congestion hotspots early in the physical design flow...\"
Correct Answer: P&R

--- EXAMPLE 2 ---
Title: \"Automated Microarchitectural Design Space Exploration using Reinforcement Learning\"
Abstract: \"This work presents a reinforcement learning agent that navigates the vast design space of modern CPUs, simultaneously optimizing for power and performance by adjusting cache sizes and branch predictor strategies.\"
Correct Answer: System-level Optimization

--- EXAMPLE 3 ---
Title: \"Leveraging Large Language Models for Automatic Generation and Verification of RTL Modules\"
Abstract: \"We introduce a novel method where an LLM generates Verilog code from natural language. The same model is then prompted to generate SystemVerilog assertions to create a self-contained verification environment.\"
Correct Answer: Code Generation, Verification
--- END OF EXAMPLES ---

Now, classify the following paper. Respond with one to three tags from the list, separated by commas.";

/// Binary in-scope classification prompt
pub fn classification_request(model: &str, title: &str, summary: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        system: CLASSIFY_SYSTEM.to_string(),
        user: format!(
            "Title: {title}\nAbstract: {summary}\n\n\
             Does this paper belong to the 'AI for Systems/Architecture/Hardware' category (true/false)?"
        ),
        temperature: 0.0,
        max_tokens: CLASSIFY_MAX_TOKENS,
    }
}

/// Subtopic tagging prompt
pub fn tagging_request(model: &str, title: &str, summary: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        system: tagging_system_prompt(),
        user: format!(
            "Title: {title}\nAbstract: {summary}\n\n\
             What are the most appropriate tags for this paper? (1-3 tags, comma-separated)"
        ),
        temperature: 0.0,
        max_tokens: TAG_MAX_TOKENS,
    }
}

fn tagging_system_prompt() -> String {
    let available = Tag::VOCABULARY
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join("`, `");

    format!(
        "You are an expert research assistant specializing in computer architecture and hardware design. \
         Your task is to assign between one and three most-fitting category tags to academic papers based on their title and abstract.\n\n\
         The paper is known to be in the 'AI for Systems/Architecture/Hardware' domain. \
         You must choose one to three tags from the following list that best describe the paper's primary contributions. \
         If only one tag fits, provide only one. Do not force multiple tags if they are not relevant.\n\
         Available tags: `{available}`\n\n\
         {TAG_DESCRIPTIONS}\n\n\
         {TAG_EXAMPLES}"
    )
}
