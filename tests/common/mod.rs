//! A small Hack CPU: resolves symbols the way the assembler does, then runs
//! the program on 16-bit wrapping arithmetic. Only the canonical comp
//! mnemonics are accepted, so malformed output fails loudly.

#![allow(dead_code)]

use std::collections::HashMap;

const FIRST_VARIABLE: u16 = 16;

#[derive(Debug, Clone)]
enum Instr {
    Address(u16),
    Compute {
        dest: String,
        comp: String,
        jump: String,
    },
}

pub struct Cpu {
    pub ram: Vec<i16>,
    pub a: i16,
    pub d: i16,
    pub pc: usize,
    program: Vec<Instr>,
    symbols: HashMap<String, u16>,
}

fn predefined() -> HashMap<String, u16> {
    let mut symbols = HashMap::new();
    for (name, addr) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
        symbols.insert(name.to_string(), addr);
    }
    for r in 0..16 {
        symbols.insert(format!("R{}", r), r);
    }
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

fn clean(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim()
}

impl Cpu {
    pub fn load(lines: &[String]) -> Cpu {
        let mut symbols = predefined();

        let mut count = 0u16;
        for line in lines.iter().map(|l| clean(l)).filter(|l| !l.is_empty()) {
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                assert!(
                    symbols.insert(label.to_string(), count).is_none(),
                    "duplicate label {}",
                    label
                );
            } else {
                count += 1;
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut program = vec![];
        for line in lines.iter().map(|l| clean(l)).filter(|l| !l.is_empty()) {
            if line.starts_with('(') {
                continue;
            }
            if let Some(value) = line.strip_prefix('@') {
                let addr = match value.parse::<u16>() {
                    Ok(n) => {
                        assert!(n <= 0x7fff, "address literal {} too wide", n);
                        n
                    }
                    Err(_) => *symbols.entry(value.to_string()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    }),
                };
                program.push(Instr::Address(addr));
                continue;
            }

            let (dest, rest) = line.split_once('=').unwrap_or(("", line));
            let (comp, jump) = rest.split_once(';').unwrap_or((rest, ""));
            program.push(Instr::Compute {
                dest: dest.to_string(),
                comp: comp.to_string(),
                jump: jump.to_string(),
            });
        }

        Cpu {
            ram: vec![0; 1 << 16],
            a: 0,
            d: 0,
            pc: 0,
            program,
            symbols,
        }
    }

    pub fn symbol(&self, name: &str) -> u16 {
        *self
            .symbols
            .get(name)
            .unwrap_or_else(|| panic!("no symbol {}", name))
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    fn m(&self) -> i16 {
        self.ram[self.a as u16 as usize]
    }

    fn compute(&self, comp: &str) -> i16 {
        let d = self.d;
        let (y, form) = if comp.contains('M') {
            (self.m(), comp.replace('M', "A"))
        } else {
            (self.a, comp.to_string())
        };
        match form.as_str() {
            "0" => 0,
            "1" => 1,
            "-1" => -1,
            "D" => d,
            "A" => y,
            "!D" => !d,
            "!A" => !y,
            "-D" => d.wrapping_neg(),
            "-A" => y.wrapping_neg(),
            "D+1" => d.wrapping_add(1),
            "A+1" => y.wrapping_add(1),
            "D-1" => d.wrapping_sub(1),
            "A-1" => y.wrapping_sub(1),
            "D+A" => d.wrapping_add(y),
            "D-A" => d.wrapping_sub(y),
            "A-D" => y.wrapping_sub(d),
            "D&A" => d & y,
            "D|A" => d | y,
            _ => panic!("invalid comp '{}'", comp),
        }
    }

    fn jumps(jump: &str, out: i16) -> bool {
        match jump {
            "" => false,
            "JGT" => out > 0,
            "JEQ" => out == 0,
            "JGE" => out >= 0,
            "JLT" => out < 0,
            "JNE" => out != 0,
            "JLE" => out <= 0,
            "JMP" => true,
            _ => panic!("invalid jump '{}'", jump),
        }
    }

    pub fn step(&mut self) {
        match self.program[self.pc].clone() {
            Instr::Address(addr) => {
                self.a = addr as i16;
                self.pc += 1;
            }
            Instr::Compute { dest, comp, jump } => {
                let out = self.compute(&comp);
                let address = self.a;
                assert!(dest.chars().all(|c| "AMD".contains(c)), "invalid dest '{}'", dest);
                if dest.contains('M') {
                    self.ram[address as u16 as usize] = out;
                }
                if dest.contains('A') {
                    self.a = out;
                }
                if dest.contains('D') {
                    self.d = out;
                }
                if Self::jumps(&jump, out) {
                    self.pc = address as u16 as usize;
                } else {
                    self.pc += 1;
                }
            }
        }
    }

    /// Run until execution falls off the end of the program.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.program.len() {
                return;
            }
            self.step();
        }
        panic!("program did not finish within {} steps", max_steps);
    }

    /// Run until the instruction at `label` is about to execute.
    pub fn run_until(&mut self, label: &str, max_steps: usize) {
        let target = self.symbol(label) as usize;
        for _ in 0..max_steps {
            if self.pc == target {
                return;
            }
            assert!(self.pc < self.program.len(), "ran off the end before {}", label);
            self.step();
        }
        panic!("{} not reached within {} steps", label, max_steps);
    }

    pub fn sp(&self) -> i16 {
        self.ram[0]
    }

    pub fn top(&self) -> i16 {
        self.ram[(self.sp() - 1) as usize]
    }
}
