//! Shared on-disk fixtures: small per-language corpora, generated model
//! files, and a seeded detector over a temporary resource directory.

use std::fs;
use std::io::BufWriter;

use tempfile::TempDir;

use crate::detector::{Detector, DetectorConfig, NGRAM_MODEL_DIR, TRAINING_DIR};
use crate::lang::Lang;
use crate::ngram_model::NgramModel;
use crate::tokenize::NgramExtractor;

const EN: [&str; 10] = [
    "This is a test string for language detection",
    "The quick brown fox jumps over the lazy dog",
    "We are testing the language of this string",
    "English is spoken in many countries around the world",
    "This string should be detected as English",
    "The weather is nice today and the sky is clear",
    "A short test of the detection code",
    "Language detection works with character models",
    "The house is on the hill near the river",
    "What is the meaning of this word",
];

const FR: [&str; 10] = [
    "Il s'agit d'une chaîne de test pour la détection de la langue",
    "Le français est parlé dans de nombreux pays du monde",
    "Cette chaîne doit être détectée comme du français",
    "La détection de la langue fonctionne avec des modèles de caractères",
    "Le temps est agréable aujourd'hui et le ciel est clair",
    "La maison est sur la colline près de la rivière",
    "Quel est le sens de ce mot",
    "Nous testons la langue de cette chaîne",
    "Un petit test du code de détection",
    "Il y a beaucoup de livres dans la bibliothèque",
];

const IT: [&str; 10] = [
    "Questa è una stringa di prova per il rilevamento della lingua",
    "L'italiano è parlato in molti paesi del mondo",
    "Questa stringa deve essere rilevata come italiano",
    "Il rilevamento della lingua funziona con modelli di caratteri",
    "Il tempo è bello oggi e il cielo è sereno",
    "La casa è sulla collina vicino al fiume",
    "Qual è il significato di questa parola",
    "Stiamo testando la lingua di questa stringa",
    "Una piccola prova del codice di rilevamento",
    "Ci sono molti libri nella biblioteca",
];

const DE: [&str; 10] = [
    "Dies ist ein Test-String für Spracherkennung",
    "Deutsch wird in vielen Ländern der Welt gesprochen",
    "Diese Zeichenkette soll als Deutsch erkannt werden",
    "Die Spracherkennung funktioniert mit Zeichenmodellen",
    "Das Wetter ist heute schön und der Himmel ist klar",
    "Das Haus steht auf dem Hügel in der Nähe des Flusses",
    "Was ist die Bedeutung dieses Wortes",
    "Wir testen die Sprache dieser Zeichenkette",
    "Ein kleiner Test des Erkennungscodes",
    "Es gibt viele Bücher in der Bibliothek",
];

const ES: [&str; 10] = [
    "Esta es una cadena de prueba para la detección de idioma",
    "El español se habla en muchos países del mundo",
    "Esta cadena debe ser detectada como español",
    "La detección de idioma funciona con modelos de caracteres",
    "El tiempo es agradable hoy y el cielo está despejado",
    "La casa está en la colina cerca del río",
    "Cuál es el significado de esta palabra",
    "Estamos probando el idioma de esta cadena",
    "Una pequeña prueba del código de detección",
    "Hay muchos libros en la biblioteca",
];

const PT: [&str; 10] = [
    "Esta é uma seqüência de teste para detecção de idioma",
    "O português é falado em muitos países do mundo",
    "Esta seqüência deve ser detectada como português",
    "A detecção de idioma funciona com modelos de caracteres",
    "O tempo está agradável hoje e o céu está limpo",
    "A casa fica na colina perto do rio",
    "Qual é o significado desta palavra",
    "Estamos testando o idioma desta seqüência",
    "Um pequeno teste do código de detecção",
    "Há muitos livros na biblioteca",
];

pub(crate) fn corpus(lang: Lang) -> &'static [&'static str] {
    match lang {
        Lang::English => &EN,
        Lang::French => &FR,
        Lang::Italian => &IT,
        Lang::German => &DE,
        Lang::Spanish => &ES,
        Lang::Portuguese => &PT,
    }
}

/// The first corpus line, used as the canonical single-language sample.
pub(crate) fn sentence(lang: Lang) -> &'static str {
    corpus(lang)[0]
}

/// The six canonical sentences concatenated, `repetitions` times over.
pub(crate) fn multilingual_text(repetitions: usize) -> String {
    let mut parts = Vec::with_capacity(repetitions * Lang::ALL.len());
    for _ in 0..repetitions {
        for lang in Lang::ALL {
            parts.push(sentence(lang));
        }
    }
    parts.join(" ")
}

/// Writes training corpora and model files for all six languages into a
/// fresh temporary directory and opens a seeded detector over it.
pub(crate) fn fixture_detector(seed: u64) -> (TempDir, Detector) {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join(TRAINING_DIR);
    fs::create_dir_all(&training).unwrap();
    let models = dir.path().join(NGRAM_MODEL_DIR);
    fs::create_dir_all(&models).unwrap();
    let extractor = NgramExtractor::new();
    for lang in Lang::ALL {
        fs::write(
            training.join(format!("{lang}_training")),
            corpus(lang).join("\n"),
        )
        .unwrap();
        for size in 1..=6 {
            let mut model = NgramModel::new(size);
            for line in corpus(lang) {
                model.accumulate_text(line, &extractor, false).unwrap();
            }
            let file = fs::File::create(models.join(format!("{lang}_{size}"))).unwrap();
            let mut wtr = BufWriter::new(file);
            model.write(&mut wtr).unwrap();
        }
    }
    let mut config = DetectorConfig::new(dir.path());
    config.seed = Some(seed);
    (dir, Detector::new(config).unwrap())
}
